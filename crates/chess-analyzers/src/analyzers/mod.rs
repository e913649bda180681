pub mod back_rank_threat;
pub mod capture;
pub mod check;
pub mod hanging_piece;
pub mod knight_fork;
pub mod promotion;
