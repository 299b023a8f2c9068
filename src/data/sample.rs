//! Bundled example bag, used by `--example` and by the picker when no CSV
//! file is found.

use crate::domain::BagRow;
use crate::error::AppError;
use crate::io::ingest::parse_bag_reader;

const EXAMPLE_BAG_CSV: &str = include_str!("../../data/example_bag.csv");

pub fn example_bag() -> Result<Vec<BagRow>, AppError> {
    Ok(parse_bag_reader(EXAMPLE_BAG_CSV.as_bytes())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_bag_is_valid() {
        let bag = example_bag().unwrap();
        assert_eq!(bag.len(), 5);
        assert!(bag.iter().all(|row| row.isin.starts_with(crate::domain::ISIN_PREFIX)));
        assert!(bag.iter().all(|row| (row.tax - 0.195).abs() < 1e-12));
    }
}
