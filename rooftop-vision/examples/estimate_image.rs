// Example: estimate the rooftop area in a single satellite image
use rooftop_imagery::{Coordinate, RooftopImage};
use rooftop_vision::{MockEstimator, RooftopEstimator, VisionEstimator, VisionSettings};
use std::fs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("🛰️  Rooftop Area Estimator");
    println!("==========================\n");

    let args: Vec<String> = std::env::args().collect();
    let Some(image_path) = args.get(1) else {
        eprintln!("Usage: cargo run --example estimate_image <IMAGE_PATH> [LAT,LON]");
        eprintln!("Example: cargo run --example estimate_image images/27.7778_78.8667.png");
        return Ok(());
    };
    let coordinate: Coordinate = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("0,0")
        .parse()?;

    println!("📂 Loading image: {}", image_path);
    let image = RooftopImage::from_bytes(coordinate, fs::read(image_path)?)?;
    let (width, height) = image.dimensions();
    println!("✅ Loaded {}x{} {:?}\n", width, height, image.format());

    let estimator: Box<dyn RooftopEstimator> = match std::env::var("OPENROUTER_API_KEY") {
        Ok(key) => Box::new(VisionEstimator::new(VisionSettings::new(key))?),
        Err(_) => {
            println!("ℹ️  OPENROUTER_API_KEY not set, using the mock estimator\n");
            Box::new(MockEstimator::new())
        }
    };

    println!("🤖 Estimating with the {} estimator...\n", estimator.name());

    match estimator.estimate(&image).await {
        Ok(estimate) => {
            println!("📊 Results:");
            println!("{}", "=".repeat(70));
            println!("   Area:        {:.2} m²", estimate.area_m2());
            println!("   Confidence:  {:.1}%", estimate.confidence() * 100.0);
            println!("   Description: {}", estimate.description());
            println!("{}", "=".repeat(70));
        }
        Err(e) => {
            eprintln!("❌ Estimation failed: {}", e);
            eprintln!("\nPossible issues:");
            eprintln!("  - Invalid OPENROUTER_API_KEY");
            eprintln!("  - Network connection problem");
            eprintln!("  - API rate limit or quota exceeded");
        }
    }

    Ok(())
}
