//! Domain entities - Objects with identity and lifecycle

mod draft;
mod letter;
mod letter_content;
mod notification;
mod sync_state;

pub use draft::{Draft, truncate_to_micros};
pub use letter::{FinalizedLetter, NewLetter, Reservation};
pub use letter_content::LetterContent;
pub use notification::{Notification, NotificationKind};
pub use sync_state::SyncState;
