//! Example: Remove coordinates outside a brain mask
//!
//! Run with `RUST_LOG=info` to see how many coordinates were dropped.

use meta_diagnostics::space::{Affine, Masker, Volume};
use meta_diagnostics::{Coordinate, Dataset, FocusFilter, Study};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 10 mm cube of 2 mm voxels; only the central 3x3x3 block is "brain"
    let affine = Affine::from_spacing_origin([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
    let mut mask = Volume::zeros([5, 5, 5], affine);
    for i in 1..4 {
        for j in 1..4 {
            for k in 1..4 {
                mask.set([i, j, k], 1.0);
            }
        }
    }

    let dataset = Dataset::new(
        vec![Study::new("inside"), Study::new("outside")],
        vec![
            Coordinate::new("inside", 4.0, 4.0, 4.0),
            Coordinate::new("inside", 2.0, 6.0, 4.0),
            Coordinate::new("outside", 0.0, 0.0, 0.0),
            Coordinate::new("outside", 50.0, 4.0, 4.0),
        ],
        Masker::new(mask),
    );

    let before = dataset.coordinates.len();
    let filtered = FocusFilter::default().transform(dataset)?;

    println!("Kept {} of {} coordinates", filtered.coordinates.len(), before);
    for study in filtered.studies() {
        println!(
            "  {}: {} foci",
            study.id,
            filtered.coordinates_for(&study.id).count()
        );
    }

    Ok(())
}
