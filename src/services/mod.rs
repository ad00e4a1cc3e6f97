pub mod cart;
pub mod circuit_breaker;
pub mod monitor;
pub mod reservations;
pub mod seating;
pub mod weather;
