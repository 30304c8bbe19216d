pub mod booking;
pub mod showing;
pub mod ticket;

pub use booking::BookingRequest;
pub use showing::{NewShowing, Showing, ShowingId};
pub use ticket::{SeatNumber, Ticket, TicketId};
