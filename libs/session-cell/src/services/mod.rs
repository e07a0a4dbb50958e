pub mod consultation;
pub mod timer;

pub use consultation::ConsultationService;
pub use timer::SessionTimer;
