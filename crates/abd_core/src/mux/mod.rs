//! Multiplexing with tsMuxeR.
//!
//! - **descriptor**: renders the `.meta` control file
//! - **tsmuxer**: runs the multiplexer into a timestamped disc folder

mod descriptor;
mod tsmuxer;

pub use descriptor::{
    is_container_path, render_descriptor, write_descriptor, DescriptorInput, DESCRIPTOR_NAME,
};
pub use tsmuxer::{
    create_output_folder, ensure_certificate_dir, output_folder_name, run_tsmuxer, OUTPUT_PREFIX,
};
