use anyhow::Result;

pub fn run() -> Result<()> {
    println!("remold {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
