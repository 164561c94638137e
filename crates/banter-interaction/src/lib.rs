pub mod persona_client;
pub mod turn_client;

pub use persona_client::HttpPersonaService;
pub use turn_client::HttpTurnGateway;
