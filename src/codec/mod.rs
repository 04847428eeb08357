//! The instruction codec: foreign stack-machine forms ⇄ canonical instructions.
//!
//! Both directions are driven by the same finite opcode metadata
//! ([`crate::backend::Op::info`]); decode collapses ~180 concrete forms onto the closed
//! canonical union, encode lowers each canonical kind back to one or more foreign
//! instructions with up-front physical identity and a final branch patch pass.
//!
//! # Main Functions
//! - [`decode_stream`] / [`decode_body`] - foreign instructions → canonical model
//! - [`encode_stream`] - canonical instructions → foreign instructions
//! - [`compute_max_stack`] - operand-stack verification over a canonical body

mod decode;
mod encode;

pub use decode::{decode_body, decode_stream};
pub use encode::{compute_max_stack, encode_stream, ArrayAccessor, ReferenceSink};
