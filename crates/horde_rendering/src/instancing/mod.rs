//! Instanced batch storage.
//!
//! ## Key Concepts
//!
//! - **Window**: a region of an instance buffer one batch can address
//! - **Metadata**: byte offset of every attribute region inside a window
//! - **Ring**: three buffer copies cycled per frame so the GPU never reads a
//!   slot that is being written
//! - **Lease**: the capability to write one slot for one frame

mod commands;
mod descriptor;
mod layout;
mod metadata;
mod view;

pub use commands::{DrawCommand, DrawCommandOutput, DrawRange, ALL_LAYERS, ALL_SPLITS};
pub use descriptor::{BatchDescriptor, BatchDescriptorDesc, BatchKind, WriteLease, RING_DEPTH};
pub use layout::{
    buffer_words_for_instances, compute_layout, round_up_to_word, BufferMode, InstanceLayout,
    EXTRA_BYTES, WORD_BYTES,
};
pub use metadata::{AttributeKind, MetadataTable, MetadataValue, HEADER_BYTES, PER_INSTANCE_FLAG};
pub use view::{InstanceWriter, WindowAddressing};
