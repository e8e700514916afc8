//! Fixtures shared by the polyrank test suites.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use polyrank_common::ResultTriple;

/// Three students by three subjects, nine distinct results.
///
/// Student 1 tops subjects 1 and 3, student 2 tops subject 2, student 3 is
/// last in subjects 1 and 2.
pub fn fixture_3x3() -> Vec<ResultTriple> {
    [
        (1, 1, 90.0),
        (1, 2, 75.0),
        (1, 3, 60.5),
        (2, 1, 70.0),
        (2, 2, 80.0),
        (2, 3, 55.0),
        (3, 1, 50.0),
        (3, 2, 65.0),
        (3, 3, 58.0),
    ]
    .iter()
    .map(|&(s, j, r)| ResultTriple::new(s, j, r))
    .collect()
}

/// Every student sits every subject. Results follow a latent ability plus
/// noise on a per-subject scale, rounded to whole marks so ties occur.
pub fn random_cohort(seed: u64, students: usize, subjects: usize) -> Vec<ResultTriple> {
    let mut rng = StdRng::seed_from_u64(seed);
    let scales: Vec<(f64, f64)> = (0..subjects)
        .map(|_| (rng.gen_range(20.0..60.0), rng.gen_range(5.0..25.0)))
        .collect();
    let abilities: Vec<f64> = (0..students).map(|_| noise(&mut rng)).collect();

    let mut triples = Vec::with_capacity(students * subjects);
    for (s, ability) in abilities.iter().enumerate() {
        for (j, &(mean, spread)) in scales.iter().enumerate() {
            let raw = mean + spread * (ability + 0.5 * noise(&mut rng));
            triples.push(ResultTriple::new(
                s as i64 + 1000,
                j as i64 + 1,
                raw.round(),
            ));
        }
    }
    triples
}

/// Like `random_cohort`, but each student sits a random subset of at least
/// two subjects.
pub fn sparse_cohort(seed: u64, students: usize, subjects: usize) -> Vec<ResultTriple> {
    assert!(subjects >= 2, "sparse cohorts need at least two subjects");
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    random_cohort(seed, students, subjects)
        .chunks(subjects)
        .flat_map(|sittings| {
            let keep_first = rng.gen_range(0..subjects - 1);
            sittings
                .iter()
                .enumerate()
                .filter(|(j, _)| *j == keep_first || *j == keep_first + 1 || rng.gen_bool(0.6))
                .map(|(_, t)| *t)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Render triples as a CSV table with the standard header.
pub fn to_csv(triples: &[ResultTriple]) -> String {
    let mut out = String::from("student_id,subject_id,result\n");
    for t in triples {
        out.push_str(&format!("{},{},{}\n", t.student_id, t.subject_id, t.result));
    }
    out
}

/// Approximately standard normal (Irwin-Hall with 12 uniforms).
fn noise(rng: &mut StdRng) -> f64 {
    (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shape() {
        let f = fixture_3x3();
        assert_eq!(f.len(), 9);
    }

    #[test]
    fn test_random_cohort_is_seeded() {
        assert_eq!(random_cohort(7, 20, 4), random_cohort(7, 20, 4));
        assert_eq!(random_cohort(7, 20, 4).len(), 80);
    }

    #[test]
    fn test_sparse_cohort_min_two_subjects() {
        let triples = sparse_cohort(3, 30, 5);
        for s in 1000..1030 {
            let n = triples.iter().filter(|t| t.student_id == s).count();
            assert!(n >= 2, "student {s} sat {n} subjects");
        }
    }

    #[test]
    fn test_to_csv_header() {
        let csv = to_csv(&fixture_3x3());
        assert!(csv.starts_with("student_id,subject_id,result\n"));
        assert_eq!(csv.lines().count(), 10);
    }
}
