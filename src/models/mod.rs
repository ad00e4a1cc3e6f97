pub mod seat;
pub mod cart;

pub use seat::{Promotion, SeatBoard, SeatId, SeatIndex, SeatMap, SeatState};
pub use cart::Cart;
