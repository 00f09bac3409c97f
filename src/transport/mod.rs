//! External interfaces a running engine talks to the outside world
//! through (spec §6.2/§6.3): view sinks and the filter callbacks that
//! narrow what they emit. Parsing the input record stream is out of
//! scope here — see [`crate::rib_engine::Record`].

mod ascii;
mod binary;
mod filter;
mod message_bus;

pub use ascii::write_view_ascii;
pub use binary::{write_view, END, PATH_END, PEER_END, PEER_LIST_SENTINEL, PFX_END, START, VIEW_MAGIC};
pub use filter::ViewFilter;
pub use message_bus::{encode_pfx_message, is_sentinel};
