pub mod patient_flow;
pub mod spawner;
