use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use solscan_core::io::ser::SerReader;
use solscan_core::io::{ContainerReader, FrameSource};

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER or video file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = ContainerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let info = reader.info();

    println!("File:        {}", info.filename.display());
    println!("Container:   {:?}", info.kind);
    println!("Frames:      {}", info.frame_count);
    println!("Dimensions:  {}x{}", info.width, info.height);
    if info.rotated {
        println!(
            "Stored as:   {}x{} (rotated on decode)",
            info.stored_width, info.stored_height
        );
    }
    println!("Bit depth:   {}", info.bit_depth);

    if let Some(ref obs) = info.observer {
        println!("Observer:    {}", obs);
    }
    if let Some(ref tel) = info.telescope {
        println!("Telescope:   {}", tel);
    }
    if let Some(ref inst) = info.instrument {
        println!("Instrument:  {}", inst);
    }

    if let ContainerReader::Ser(ref ser) = reader {
        print_ser_details(ser)?;
    }

    Ok(())
}

fn print_ser_details(reader: &SerReader) -> Result<()> {
    let header = &reader.header;
    println!("Color id:    {}", header.color_id);
    println!("Date:        {}", header.date_time);
    println!("Date (UTC):  {}", header.date_time_utc);

    let frame_bytes = header.frame_byte_size()?;
    let total_mb = (frame_bytes * reader.frame_count()) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    let data_end = header.data_end()?;
    if reader.file_len() < data_end {
        println!(
            "Truncated:   {} of {} bytes present",
            reader.file_len(),
            data_end
        );
    }

    let count = reader.frame_count();
    match (reader.read_timestamp(0), count.checked_sub(1).and_then(|i| reader.read_timestamp(i))) {
        (Some(first), Some(last)) => {
            println!("First stamp: {}", first);
            println!("Last stamp:  {}", last);
        }
        _ => println!("Timestamps:  none"),
    }
    Ok(())
}
