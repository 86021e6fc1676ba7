//! Noisy-XOR classifier demo: train on a 12-bit binary dataset whose
//! label is the XOR of the first two bits, with the remaining ten
//! bits as pure noise and a configurable fraction of training labels
//! flipped. Reports test accuracy on a noise-free holdout set.

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tsetlini::ClassifierClassic;

#[derive(Parser)]
#[command(author, version, about = "Noisy-XOR Tsetlin Machine classifier demo")]
struct Args {
    /// Path to a JSON params file; falls back to the scenario defaults.
    #[arg(long)]
    config: Option<String>,
    #[arg(long, default_value_t = 200)]
    epochs: u32,
    #[arg(long, default_value_t = 1)]
    seed: u32,
    #[arg(long, default_value_t = 10_000)]
    train_size: usize,
    #[arg(long, default_value_t = 0.05)]
    noise: f64,
    #[arg(long)]
    verbose: bool,
}

fn make_dataset(n: usize, noise: f64, rng: &mut StdRng) -> (Vec<Vec<u8>>, Vec<i32>) {
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let bits: Vec<u8> = (0..12).map(|_| rng.gen_range(0..=1u8)).collect();
        let mut label = (bits[0] ^ bits[1]) as i32;
        if rng.gen::<f64>() < noise {
            label = 1 - label;
        }
        x.push(bits);
        y.push(label);
    }
    (x, y)
}

fn main() {
    let args = Args::parse();
    tsetlini::logging::init(args.verbose);

    let params = tsetlini::config::load_or_default(args.config.as_deref())
        .expect("config must be valid JSON matching the params schema");
    let params_json = serde_json::json!({
        "clauses_per_label": params.clauses,
        "threshold": params.threshold,
        "s": params.s,
        "number_of_states": params.number_of_states,
        "boost_true_positive_feedback": params.boost_true_positive_feedback,
        "random_state": args.seed,
    })
    .to_string();

    let mut rng = StdRng::seed_from_u64(args.seed as u64);
    let (train_x, train_y) = make_dataset(args.train_size, args.noise, &mut rng);
    let (test_x, test_y) = make_dataset(2_000, 0.0, &mut rng);

    let mut clf = ClassifierClassic::new(&params_json).expect("valid params");
    clf.fit(&train_x, &train_y, None, args.epochs).expect("fit on validated training data");

    let accuracy = clf.evaluate(&test_x, &test_y).expect("evaluate on validated holdout data");
    log::info!("noisy-xor test accuracy: {:.4}", accuracy);

    let positive = vec![1u8, 0, 1, 1, 1, 0, 1, 1, 1, 0, 0, 0];
    let negative = vec![0u8, 0, 1, 1, 1, 0, 1, 1, 1, 0, 0, 0];
    let preds = clf.predict(&[positive, negative]).expect("predict on validated rows");
    println!("accuracy = {accuracy:.4}");
    println!("predict([1,0,1,1,1,0,1,1,1,0,0,0]) = {}", preds[0]);
    println!("predict([0,0,1,1,1,0,1,1,1,0,0,0]) = {}", preds[1]);
}
