use relief_core::{Curve, Surface, SurfaceField};
use relief_storage::MaskStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Build a 320x240 mask with a single raised top ridge
    let mut field = SurfaceField::new(320, 240);
    let mut ridge = Curve::new(320);
    ridge.insert_point(80, 0.0)?;
    ridge.insert_point(160, 0.45)?;
    ridge.insert_point(240, 0.0)?;
    field.insert_ridge(120, ridge, Surface::Top)?;

    // Init storage
    let store = MaskStore::init("mongodb://localhost:27017", "relief_db", "masks").await?;

    // Insert & read back
    store.save("example", &field).await?;
    match store.load("example").await? {
        Some(found) => println!(
            "Round-trip success: height at (160, 120) = {}",
            found.mask_profile(120, Surface::Top).height(160)
        ),
        None => println!("Mask not found!"),
    }

    // Clean up
    store.delete("example").await?;

    Ok(())
}
