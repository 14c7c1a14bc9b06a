pub use bon::{bon, builder, Builder};
pub use colored::Colorize;
pub use derive_new::new;
pub use foldhash::{HashMapExt, HashSetExt};
pub use itertools::Itertools;
pub use log::{debug, info, warn};
pub use logging_timer::{finish, time, timer};
pub use ordered_float::OrderedFloat;
pub use prettytable::*;
pub use rand::rngs::StdRng;
pub use rand::{Rng, SeedableRng};
pub use rayon::prelude::*;
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use std::fmt;
pub use std::fs;
pub use std::hash::Hash;
pub use std::io::Write;
pub use std::path::{Path, PathBuf};
pub use std::process::Command;

pub type IndexMap<K, V> = indexmap::IndexMap<K, V, foldhash::fast::RandomState>;
pub type IndexSet<T> = indexmap::IndexSet<T, foldhash::fast::RandomState>;
pub type Set<T> = foldhash::HashSet<T>;
pub type Dict<K, V> = foldhash::HashMap<K, V>;
pub type Coord = (i32, i32);

/// Sample standard deviation (n - 1 denominator); zero for fewer than two samples.
pub fn stdev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}
/// Population standard deviation.
pub fn pstdev(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let m = mean(samples);
    (samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
}
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
/// Solver-friendly signed integer: `p3`, `m1`, `p0`.
pub fn signed_tag(value: i32) -> String {
    format!("{}{}", if value < 0 { 'm' } else { 'p' }, value.abs())
}
pub fn parse_signed_tag(tag: &str) -> Option<i32> {
    let mut chars = tag.chars();
    let sign = match chars.next()? {
        'p' => 1,
        'm' => -1,
        _ => return None,
    };
    chars.as_str().parse::<i32>().ok().map(|v| sign * v)
}
pub fn chebyshev(a: Coord, b: Coord) -> i32 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_tag() {
        assert_eq!(signed_tag(-2), "m2");
        assert_eq!(signed_tag(0), "p0");
        assert_eq!(parse_signed_tag("m2"), Some(-2));
        assert_eq!(parse_signed_tag("p13"), Some(13));
        assert_eq!(parse_signed_tag("x1"), None);
    }
    #[test]
    fn test_stdev() {
        assert_eq!(stdev(&[1.0]), 0.0);
        assert!((stdev(&[1.0, 3.0]) - 2f64.sqrt()).abs() < 1e-12);
        assert!((pstdev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
