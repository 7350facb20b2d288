//! K-means, G-means, X-means, and Dip-means on a simple 2D dataset.
//!
//! Run with `RUST_LOG=splitmeans=debug` to see per-round progress.

use splitmeans::{Clusterer, DipMeans, GMeans, Kmeans, XMeans};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Three well-separated groups in 2D, on small grids.
    let mut data: Vec<Vec<f32>> = Vec::new();
    for (cx, cy) in [(0.0f32, 0.0f32), (5.0, 5.0), (10.0, 0.0)] {
        for i in 0..16 {
            let dx = (i % 4) as f32 * 0.1;
            let dy = (i / 4) as f32 * 0.1;
            data.push(vec![cx + dx, cy + dy]);
        }
    }

    // --- K-means (k=3) ---
    let fit = Kmeans::new(3).with_seed(42).fit(&data).unwrap();
    println!("=== K-means (k=3) ===");
    print_fit(&data, &fit);

    // --- G-means ---
    let fit = GMeans::new().with_max_clusters(10).fit(&data).unwrap();
    println!("\n=== G-means (max_clusters=10) ===");
    print_fit(&data, &fit);

    // --- X-means ---
    let fit = XMeans::new().with_max_clusters(10).fit(&data).unwrap();
    println!("\n=== X-means (max_clusters=10) ===");
    print_fit(&data, &fit);

    // --- Dip-means ---
    let fit = DipMeans::new().with_max_clusters(10).fit(&data).unwrap();
    println!("\n=== Dip-means (max_clusters=10) ===");
    print_fit(&data, &fit);
}

fn print_fit(data: &[Vec<f32>], fit: &splitmeans::CentroidFit) {
    println!(
        "  k = {} after {} rounds ({})",
        fit.n_clusters(),
        fit.rounds,
        if fit.converged { "converged" } else { "round limit" }
    );
    for (i, c) in fit.centers.iter().enumerate() {
        println!("  center {} = ({:5.2}, {:5.2})", i, c[0], c[1]);
    }
    for (i, label) in fit.labels.iter().enumerate().step_by(8) {
        println!("  point {:2} ({:5.1}, {:5.1}) => cluster {}", i, data[i][0], data[i][1], label);
    }
}
