pub mod core {
    pub mod car;
    pub mod coordinator;
    pub mod driver;
    pub mod feedback;
    pub mod handle_race;
    pub mod race;
    pub mod scheduler;
    pub mod sensor;
    pub mod state_handler;
    #[cfg(test)]
    pub mod testing;
    pub mod track;
    pub mod vehicle;
}
pub mod interfaces {
    pub mod kinematic;
    pub mod obstacles;
    pub mod telemetry;
}
pub mod post {
    pub mod race_result;
}
pub mod pre {
    pub mod read_sim_pars;
    pub mod sim_opts;
}
