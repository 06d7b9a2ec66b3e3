//! The bundled diagnostic-cells table.
//!
//! Shaped after the Wisconsin diagnostic breast-cancer table: 569 samples,
//! 30 features (ten nucleus measurements, each as mean, standard error and
//! worst value) and two classes, `malignant` (212 rows) and `benign` (357 rows).
//!
//! The rows are a synthetic stand-in produced from a fixed internal seed. Each
//! sample gets a latent severity, centred on 1 for malignant rows and 0 for
//! benign ones, and every feature is a noisy linear reading of it between the
//! two class means. The classes reach the features only through the severity,
//! so the latent overlap caps attainable accuracy near 0.96. The output is
//! identical on every call. The original table loads through
//! [`Dataset::from_csv`](crate::data::Dataset::from_csv).

use crate::data::dataset::Dataset;
use crate::error::MlError;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const N_SAMPLES: usize = 569;
pub const N_MALIGNANT: usize = 212;
pub const N_BENIGN: usize = 357;

const GENERATOR_SEED: u64 = 0x5744_4243;
/// Standard deviation of the severity within a class; the class centres are 1 apart.
const SEVERITY_SPREAD: f64 = 0.28;
const OWN_WEIGHT: f64 = 0.8;

/// `(name, malignant mean, benign mean, spread)` per column.
const FEATURES: [(&str, f64, f64, f64); 30] = [
    ("mean radius", 17.46, 12.15, 2.5),
    ("mean texture", 21.60, 17.91, 3.8),
    ("mean perimeter", 115.37, 78.08, 17.0),
    ("mean area", 978.4, 462.8, 250.0),
    ("mean smoothness", 0.1029, 0.0925, 0.013),
    ("mean compactness", 0.1452, 0.0801, 0.045),
    ("mean concavity", 0.1608, 0.0461, 0.06),
    ("mean concave points", 0.0880, 0.0257, 0.03),
    ("mean symmetry", 0.1929, 0.1742, 0.026),
    ("mean fractal dimension", 0.0627, 0.0629, 0.007),
    ("radius error", 0.609, 0.284, 0.25),
    ("texture error", 1.211, 1.220, 0.55),
    ("perimeter error", 4.324, 2.000, 1.8),
    ("area error", 72.67, 21.14, 35.0),
    ("smoothness error", 0.00678, 0.00720, 0.003),
    ("compactness error", 0.0323, 0.0214, 0.017),
    ("concavity error", 0.0418, 0.0260, 0.025),
    ("concave points error", 0.0151, 0.00986, 0.006),
    ("symmetry error", 0.0205, 0.0206, 0.008),
    ("fractal dimension error", 0.00406, 0.00364, 0.0025),
    ("worst radius", 21.13, 13.38, 3.5),
    ("worst texture", 29.32, 23.52, 5.5),
    ("worst perimeter", 141.37, 87.01, 25.0),
    ("worst area", 1422.3, 558.9, 400.0),
    ("worst smoothness", 0.1448, 0.1250, 0.02),
    ("worst compactness", 0.3748, 0.1827, 0.14),
    ("worst concavity", 0.4506, 0.1662, 0.17),
    ("worst concave points", 0.1822, 0.0744, 0.05),
    ("worst symmetry", 0.3235, 0.2702, 0.055),
    ("worst fractal dimension", 0.0915, 0.0794, 0.016),
];

pub const TARGET_NAMES: [&str; 2] = ["malignant", "benign"];

/// Load the bundled table.
pub fn diagnostic_cells() -> Result<Dataset, MlError> {
    let mut rng = StdRng::seed_from_u64(GENERATOR_SEED);

    let mut targets: Vec<usize> = std::iter::repeat_n(0, N_MALIGNANT)
        .chain(std::iter::repeat_n(1, N_BENIGN))
        .collect();
    targets.shuffle(&mut rng);

    let mut values = Vec::with_capacity(N_SAMPLES * FEATURES.len());
    for &class in &targets {
        let centre = if class == 0 { 1.0 } else { 0.0 };
        let severity = centre + SEVERITY_SPREAD * standard_normal(&mut rng);
        for &(_, malignant, benign, spread) in &FEATURES {
            let reading = benign + (malignant - benign) * severity;
            let noise = OWN_WEIGHT * standard_normal(&mut rng);
            // Measurements are positive; keep the tail off zero.
            let floor = 0.05 * malignant.min(benign);
            values.push((reading + spread * noise).max(floor));
        }
    }

    let features = Array2::from_shape_vec((N_SAMPLES, FEATURES.len()), values)
        .map_err(|e| MlError::dataset(format!("built-in table shape: {e}")))?;
    Dataset::new(
        "diagnostic_cells",
        FEATURES.iter().map(|(name, ..)| name.to_string()).collect(),
        TARGET_NAMES.iter().map(|s| s.to_string()).collect(),
        features,
        targets,
    )
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
