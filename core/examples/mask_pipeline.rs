use relief_core::{Curve, ReliefMask, Surface, SurfaceField};
use std::path::Path;

fn ridge(size: usize, points: &[(usize, f64)]) -> Curve {
    let mut c = Curve::new(size);
    for &(loc, h) in points {
        c.insert_point(loc, h).expect("point inside the ridge");
    }
    c
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // A 256x192 volume with a dome-like top surface and a shallow bottom
    let (xdim, ydim) = (256, 192);
    let mut field = SurfaceField::new(xdim, ydim);
    field.insert_ridge(
        60,
        ridge(xdim, &[(40, 0.0), (90, 0.35), (170, 0.4), (220, 0.0)]),
        Surface::Top,
    )?;
    field.insert_ridge(
        130,
        ridge(xdim, &[(60, 0.0), (128, 0.3), (200, 0.0)]),
        Surface::Top,
    )?;
    field.insert_ridge(
        95,
        ridge(xdim, &[(0, 0.1), (128, 0.2), (255, 0.1)]),
        Surface::Bottom,
    )?;

    // Rasterize the whole grid
    let mut mask = ReliefMask::new(xdim, ydim);
    field.copy_to_relief_mask(&mut mask, None, false)?;

    let out = Path::new("mask_pipeline");
    std::fs::create_dir_all(out)?;
    mask.save_png(out.join("mask16.png"))?;
    mask.preview_rows(0..=ydim - 1).save(out.join("preview.png"))?;
    std::fs::write(out.join("mask.json"), field.to_json_string()?)?;

    println!("Saved mask16.png, preview.png and mask.json to {}", out.display());
    Ok(())
}
