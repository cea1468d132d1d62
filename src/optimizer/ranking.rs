use crate::optimizer::SweepPoint;

/// Sort by mean descending, then by lower spread. The sort is stable, so full ties keep grid order.
pub fn rank_points(points: &[SweepPoint]) -> Vec<SweepPoint> {
    let mut ranked = points.to_vec();
    ranked.sort_by(|left, right| {
        right
            .statistic
            .mean
            .total_cmp(&left.statistic.mean)
            .then_with(|| left.statistic.std_dev.total_cmp(&right.statistic.std_dev))
    });
    ranked
}

/// Highest mean wins; ties go to the point seen first.
pub fn select_optimum(points: &[SweepPoint]) -> Option<SweepPoint> {
    let mut best: Option<&SweepPoint> = None;
    for point in points {
        match best {
            Some(current) if point.statistic.mean <= current.statistic.mean => {}
            _ => best = Some(point),
        }
    }
    best.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::monte_carlo::Statistic;
    use crate::simulation::WorkloadWeights;

    fn point(parameter: usize, mean: f64, std_dev: f64) -> SweepPoint {
        SweepPoint {
            weights: WorkloadWeights::default(),
            parameter,
            statistic: Statistic {
                mean,
                std_dev,
                std_err: std_dev,
                runs: 4,
            },
        }
    }

    #[test]
    fn optimum_ties_go_to_first_seen() {
        let points = vec![point(10, 3.0, 0.0), point(20, 5.0, 1.0), point(30, 5.0, 0.0)];
        let best = select_optimum(&points).expect("non-empty");
        assert_eq!(best.parameter, 20);
    }

    #[test]
    fn optimum_of_nothing_is_none() {
        assert!(select_optimum(&[]).is_none());
    }

    #[test]
    fn ranking_orders_by_mean_then_spread() {
        let points = vec![point(10, 3.0, 0.0), point(20, 5.0, 1.0), point(30, 5.0, 0.5), point(40, 1.0, 0.0)];
        let order: Vec<usize> = rank_points(&points).iter().map(|p| p.parameter).collect();
        assert_eq!(order, vec![30, 20, 10, 40]);
    }
}
