impl std::fmt::Debug for crate::State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("t", &self.t)
            .field(
                "occupied",
                &self.population.iter().filter(|&&n| n > 0.0).count(),
            )
            .field("patches", &self.population.len())
            .field("total", &self.population.iter().sum::<f64>())
            .finish()
    }
}

impl std::fmt::Debug for crate::matrix::DispersalMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispersalMatrix")
            .field("patches", &self.size())
            .finish()
    }
}

impl std::fmt::Debug for crate::matrix::Augmented {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Augmented")
            .field("patches", &self.size())
            .finish()
    }
}
