use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
};

use rand::Rng;
use serde::Deserialize;

use sparsevo_core::{framepoint::PointHypothesis, Real};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot open settings file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read settings file: {0}")]
    Read(#[from] std::io::Error),

    #[error("settings file ends before line {line}")]
    MissingLine { line: usize },

    #[error("settings line {line} is not a number: {value:?}")]
    Parse { line: usize, value: String },
}

/// Admission thresholds for exported points, one immutable value per publish
/// batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointFilterCfg {
    pub abs_variance_threshold: Real,
    pub rel_variance_threshold: Real,
    pub min_relative_baseline: Real,
    pub sparsify_factor: u32,
}

impl Default for PointFilterCfg {
    fn default() -> Self {
        Self {
            abs_variance_threshold: 7.197e-8,
            rel_variance_threshold: 547.0,
            min_relative_baseline: 0.8988,
            sparsify_factor: 0,
        }
    }
}

impl PointFilterCfg {
    /// Loads thresholds from a plain-text file of exactly four positional
    /// lines: absolute-variance threshold, relative-variance threshold,
    /// minimum relative baseline, sparsify factor. Surrounding whitespace is
    /// tolerated, comments and blank lines are not.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SettingsError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut lines = Vec::with_capacity(4);
        for (index, line) in BufReader::new(file).lines().take(4).enumerate() {
            lines.push((index + 1, line?));
        }
        if lines.len() < 4 {
            return Err(SettingsError::MissingLine {
                line: lines.len() + 1,
            });
        }

        Ok(Self {
            abs_variance_threshold: parse_line(&lines[0])?,
            rel_variance_threshold: parse_line(&lines[1])?,
            min_relative_baseline: parse_line(&lines[2])?,
            sparsify_factor: parse_line(&lines[3])?,
        })
    }
}

fn parse_line<T: FromStr>((line, value): &(usize, String)) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::Parse {
        line: *line,
        value: value.clone(),
    })
}

/// Statistical admission test for marginalized points.
///
/// Test order is load-bearing: each test is a statistically cheaper
/// pre-filter for the next.
pub struct PointFilter {
    cfg: PointFilterCfg,
}

impl PointFilter {
    pub fn new(cfg: PointFilterCfg) -> Self {
        Self { cfg }
    }

    /// Decides whether one point enters the exported cloud. Consumes a single
    /// RNG draw when sparsification is active, otherwise a pure function of
    /// `(point, depth, cfg)`.
    pub fn admit<R: Rng>(&self, point: &PointHypothesis, depth: Real, rng: &mut R) -> bool {
        if self.cfg.sparsify_factor > 1 && rng.gen_range(0..self.cfg.sparsify_factor) != 0 {
            return false;
        }

        // 0.01 keeps the division finite for zero-information points
        let variance = 1.0 / (point.inverse_depth_information + 0.01);
        if variance > self.cfg.abs_variance_threshold {
            return false;
        }

        // depth^4 rescaling makes the bound depth-invariant under the
        // inverse-depth parameterization
        let depth4 = (depth * depth) * (depth * depth);
        if variance * depth4 > self.cfg.rel_variance_threshold {
            return false;
        }

        point.max_relative_baseline >= self.cfg.min_relative_baseline
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rand::{rngs::StdRng, SeedableRng};
    use sparsevo_core::framepoint::PointHypothesis;

    use super::{PointFilter, PointFilterCfg, SettingsError};

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn test_point() -> PointHypothesis {
        PointHypothesis {
            u: 100.0,
            v: 50.0,
            inverse_depth: 0.5,
            inverse_depth_information: 10.0,
            max_relative_baseline: 0.95,
        }
    }

    fn permissive_cfg() -> PointFilterCfg {
        PointFilterCfg {
            abs_variance_threshold: 1.0,
            rel_variance_threshold: 1e6,
            min_relative_baseline: 0.5,
            sparsify_factor: 0,
        }
    }

    #[test]
    fn load_reads_four_positional_lines() {
        let file = settings_file("1.0\n1e6\n0.5\n4\n");

        let cfg = PointFilterCfg::load(file.path()).unwrap();
        assert_eq!(
            cfg,
            PointFilterCfg {
                abs_variance_threshold: 1.0,
                rel_variance_threshold: 1e6,
                min_relative_baseline: 0.5,
                sparsify_factor: 4,
            }
        );
    }

    #[test]
    fn load_tolerates_surrounding_whitespace() {
        let file = settings_file("  7.197e-8\t\n547.0 \n 0.8988\n 0 \n");

        let cfg = PointFilterCfg::load(file.path()).unwrap();
        assert_eq!(cfg, PointFilterCfg::default());
    }

    #[test]
    fn load_fails_for_missing_file() {
        let err = PointFilterCfg::load("no/such/settings.txt").unwrap_err();
        assert!(matches!(err, SettingsError::Open { .. }));
    }

    #[test]
    fn load_fails_for_short_file() {
        let file = settings_file("1.0\n1e6\n");

        let err = PointFilterCfg::load(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::MissingLine { line: 3 }));
    }

    #[test]
    fn load_reports_unparsable_line() {
        let file = settings_file("1.0\nbogus\n0.5\n0\n");

        let err = PointFilterCfg::load(file.path()).unwrap_err();
        match err {
            SettingsError::Parse { line, value } => {
                assert_eq!(line, 2);
                assert_eq!(value, "bogus");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn load_does_not_cache_across_calls() {
        let first = settings_file("1.0\n1e6\n0.5\n0\n");
        let second = settings_file("2.0\n1e3\n0.7\n8\n");

        let a = PointFilterCfg::load(first.path()).unwrap();
        let b = PointFilterCfg::load(second.path()).unwrap();
        assert_ne!(a, b);
        assert_eq!(b.sparsify_factor, 8);
    }

    #[test]
    fn admit_is_deterministic_without_sparsification() {
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;

        for sparsify_factor in [0, 1] {
            let filter = PointFilter::new(PointFilterCfg {
                sparsify_factor,
                ..permissive_cfg()
            });
            let mut rng = StdRng::seed_from_u64(1);
            let first = filter.admit(&point, depth, &mut rng);
            let repeats: Vec<bool> = (0..100)
                .map(|_| filter.admit(&point, depth, &mut rng))
                .collect();
            assert!(repeats.iter().all(|&admitted| admitted == first));
            assert!(first);
        }
    }

    #[test]
    fn admit_rejects_high_absolute_variance() {
        // variance = 1 / 10.01 ~ 0.0999
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;
        let mut rng = StdRng::seed_from_u64(1);

        let strict = PointFilter::new(PointFilterCfg {
            abs_variance_threshold: 0.05,
            ..permissive_cfg()
        });
        assert!(!strict.admit(&point, depth, &mut rng));

        let relaxed = PointFilter::new(permissive_cfg());
        assert!(relaxed.admit(&point, depth, &mut rng));
    }

    #[test]
    fn admit_rejects_high_depth_scaled_variance() {
        // variance * depth^4 = 0.0999 * 16 ~ 1.598
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;
        let mut rng = StdRng::seed_from_u64(1);

        let strict = PointFilter::new(PointFilterCfg {
            rel_variance_threshold: 1.0,
            ..permissive_cfg()
        });
        assert!(!strict.admit(&point, depth, &mut rng));

        let relaxed = PointFilter::new(PointFilterCfg {
            rel_variance_threshold: 2.0,
            ..permissive_cfg()
        });
        assert!(relaxed.admit(&point, depth, &mut rng));
    }

    #[test]
    fn admit_rejects_insufficient_baseline() {
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;
        let mut rng = StdRng::seed_from_u64(1);

        let strict = PointFilter::new(PointFilterCfg {
            min_relative_baseline: 0.96,
            ..permissive_cfg()
        });
        assert!(!strict.admit(&point, depth, &mut rng));

        let exact = PointFilter::new(PointFilterCfg {
            min_relative_baseline: 0.95,
            ..permissive_cfg()
        });
        assert!(exact.admit(&point, depth, &mut rng));
    }

    #[test]
    fn raising_thresholds_never_rejects_an_admitted_point() {
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;
        let mut rng = StdRng::seed_from_u64(1);

        let abs_thresholds = [0.05, 0.0999, 0.2, 1.0];
        let rel_thresholds = [1.0, 1.598, 10.0, 1e6];

        for (abs_index, &abs_variance_threshold) in abs_thresholds.iter().enumerate() {
            for (rel_index, &rel_variance_threshold) in rel_thresholds.iter().enumerate() {
                let admitted = PointFilter::new(PointFilterCfg {
                    abs_variance_threshold,
                    rel_variance_threshold,
                    ..permissive_cfg()
                })
                .admit(&point, depth, &mut rng);

                if admitted {
                    for &abs_higher in &abs_thresholds[abs_index..] {
                        for &rel_higher in &rel_thresholds[rel_index..] {
                            assert!(PointFilter::new(PointFilterCfg {
                                abs_variance_threshold: abs_higher,
                                rel_variance_threshold: rel_higher,
                                ..permissive_cfg()
                            })
                            .admit(&point, depth, &mut rng));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn sparsification_admits_one_in_k() {
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;
        let filter = PointFilter::new(PointFilterCfg {
            sparsify_factor: 4,
            ..permissive_cfg()
        });

        let mut rng = StdRng::seed_from_u64(7);
        let trials = 20_000;
        let admitted = (0..trials)
            .filter(|_| filter.admit(&point, depth, &mut rng))
            .count();

        let fraction = admitted as f64 / trials as f64;
        assert!(
            (fraction - 0.25).abs() < 0.02,
            "admitted fraction {fraction} too far from 1/4"
        );
    }

    #[test]
    fn seeded_sparsification_is_reproducible() {
        let point = test_point();
        let depth = 1.0 / point.inverse_depth;
        let filter = PointFilter::new(PointFilterCfg {
            sparsify_factor: 3,
            ..permissive_cfg()
        });

        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            assert_eq!(
                filter.admit(&point, depth, &mut first),
                filter.admit(&point, depth, &mut second)
            );
        }
    }
}
