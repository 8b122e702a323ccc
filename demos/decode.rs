use bgzf_reader::{BGZFReader, Offset};
use clap::Parser;
use std::fs::File;
use std::io;

#[derive(Debug, Parser)]
struct Cli {
    input_file: String,
    #[arg(short, long)]
    output: String,
    /// Packed virtual offset (`file << 16 | block`) to start decoding from
    #[arg(short, long)]
    seek: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file_reader = File::open(&cli.input_file)?;
    let mut file_writer = File::create(&cli.output)?;

    let mut reader = BGZFReader::new(file_reader)?;
    if let Some(pos) = cli.seek {
        reader.seek(Offset::from_virtual(pos))?;
    }
    io::copy(&mut reader, &mut file_writer)?;

    let touched = reader.last_chunk();
    eprintln!("decoded {} .. {}", touched.begin, touched.end);

    Ok(())
}
