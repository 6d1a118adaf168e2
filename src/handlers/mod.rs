pub mod biometric;
pub mod completion;
pub mod config;
pub mod credential;
pub mod keygen;
pub mod sign;
pub mod verify;
