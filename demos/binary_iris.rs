//! Binary Iris classifier demo: a synthetic 16-bit binarized
//! three-class dataset in the same shape as the thermometer-encoded
//! Iris set the reference ships as example data, trained/evaluated
//! over a shuffled 80/20 split.

use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tsetlini::ClassifierClassic;

#[derive(Parser)]
#[command(author, version, about = "Binary-Iris Tsetlin Machine classifier demo")]
struct Args {
    #[arg(long)]
    config: Option<String>,
    #[arg(long, default_value_t = 300)]
    epochs: u32,
    #[arg(long, default_value_t = 1)]
    seed: u32,
    #[arg(long)]
    verbose: bool,
}

/// Three well-separated 16-bit "thermometer" cluster centers plus
/// per-sample bit flips, standing in for the reference's real
/// measurement-binarized Iris data (not shipped with this crate).
fn make_dataset(n_per_label: usize, flip_rate: f64, rng: &mut StdRng) -> (Vec<Vec<u8>>, Vec<i32>) {
    let centers: [[u8; 16]; 3] = [
        [1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0],
    ];
    let mut x = Vec::new();
    let mut y = Vec::new();
    for (label, center) in centers.iter().enumerate() {
        for _ in 0..n_per_label {
            let row: Vec<u8> = center
                .iter()
                .map(|&bit| if rng.gen::<f64>() < flip_rate { 1 - bit } else { bit })
                .collect();
            x.push(row);
            y.push(label as i32);
        }
    }
    (x, y)
}

fn shuffled_split(n: usize, seed: u32) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut rng);
    let split = (n * 4) / 5;
    (idx[..split].to_vec(), idx[split..].to_vec())
}

fn main() {
    let args = Args::parse();
    tsetlini::logging::init(args.verbose);

    let params = tsetlini::config::load_or_default(args.config.as_deref())
        .expect("config must be valid JSON matching the params schema");
    let params_json = serde_json::json!({
        "clauses_per_label": 100,
        "threshold": 10,
        "s": 3.0,
        "number_of_states": params.number_of_states,
        "boost_true_positive_feedback": true,
        "random_state": args.seed,
    })
    .to_string();

    let mut gen = StdRng::seed_from_u64(args.seed as u64 ^ 0x5DEECE66D);
    let (x, y) = make_dataset(100, 0.08, &mut gen);
    let (train_idx, test_idx) = shuffled_split(x.len(), args.seed);

    let train_x: Vec<_> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let train_y: Vec<_> = train_idx.iter().map(|&i| y[i]).collect();
    let test_x: Vec<_> = test_idx.iter().map(|&i| x[i].clone()).collect();
    let test_y: Vec<_> = test_idx.iter().map(|&i| y[i]).collect();

    let mut clf = ClassifierClassic::new(&params_json).expect("valid params");
    clf.fit(&train_x, &train_y, None, args.epochs).expect("fit on validated training data");

    let accuracy = clf.evaluate(&test_x, &test_y).expect("evaluate on validated holdout data");
    log::info!("binary-iris test accuracy: {:.4}", accuracy);
    println!("accuracy = {accuracy:.4}");
}
