//! Industry profiles for the trend-interpretation stage
//!
//! Benchmarks are coarse sector medians used only to anchor the model's
//! industry comparison; they are not data-provider figures. Unknown
//! industries fall back to the default profile.

/// Benchmark indicator levels for an industry, in percent
#[derive(Debug, Clone, Copy)]
pub struct IndustryBenchmarks {
    pub gross_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
}

/// Interpretation context for one industry
#[derive(Debug, Clone, Copy)]
pub struct IndustryProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub benchmarks: IndustryBenchmarks,
    pub key_factors: &'static [&'static str],
    pub risks: &'static [&'static str],
}

/// Fallback profile when the industry is unknown or unlisted
pub static DEFAULT_PROFILE: IndustryProfile = IndustryProfile {
    name: "default",
    description: "General analysis of the company's financial performance",
    benchmarks: IndustryBenchmarks {
        gross_margin: Some(30.0),
        net_margin: Some(10.0),
        roe: Some(15.0),
    },
    key_factors: &["profitability", "growth", "financial health", "industry position"],
    risks: &["macro cycle", "industry competition", "operational execution"],
};

static PROFILES: [IndustryProfile; 6] = [
    IndustryProfile {
        name: "spirits",
        description: "Premium spirits: brand-driven pricing power, high gross margins, channel inventory cycles",
        benchmarks: IndustryBenchmarks {
            gross_margin: Some(70.0),
            net_margin: Some(30.0),
            roe: Some(25.0),
        },
        key_factors: &["brand strength", "pricing power", "channel inventory", "premiumization"],
        risks: &["consumption downturn", "channel destocking", "policy on liquor consumption"],
    },
    IndustryProfile {
        name: "banking",
        description: "Banks: spread-driven earnings, asset quality dominates; leverage ratios read differently than for industrials",
        benchmarks: IndustryBenchmarks {
            gross_margin: None,
            net_margin: Some(30.0),
            roe: Some(11.0),
        },
        key_factors: &["net interest margin", "non-performing loans", "capital adequacy", "fee income"],
        risks: &["credit cycle", "rate compression", "regulatory tightening"],
    },
    IndustryProfile {
        name: "real estate",
        description: "Developers: pre-sale driven revenue recognition, heavy leverage, land bank quality",
        benchmarks: IndustryBenchmarks {
            gross_margin: Some(20.0),
            net_margin: Some(8.0),
            roe: Some(10.0),
        },
        key_factors: &["contracted sales", "land bank", "funding cost", "completion pace"],
        risks: &["policy restrictions", "refinancing", "inventory impairment"],
    },
    IndustryProfile {
        name: "pharmaceuticals",
        description: "Pharma: pipeline-driven growth, R&D intensity, pricing subject to procurement programs",
        benchmarks: IndustryBenchmarks {
            gross_margin: Some(60.0),
            net_margin: Some(15.0),
            roe: Some(15.0),
        },
        key_factors: &["R&D pipeline", "procurement pricing", "product mix", "approval cadence"],
        risks: &["centralized procurement cuts", "trial failures", "patent cliffs"],
    },
    IndustryProfile {
        name: "semiconductors",
        description: "Semis: cyclical demand, capex intensity, utilization drives margins",
        benchmarks: IndustryBenchmarks {
            gross_margin: Some(35.0),
            net_margin: Some(12.0),
            roe: Some(12.0),
        },
        key_factors: &["capacity utilization", "process node", "inventory cycle", "export controls"],
        risks: &["demand cycle", "technology transitions", "trade restrictions"],
    },
    IndustryProfile {
        name: "software",
        description: "Software: recurring revenue quality, high gross margin, operating leverage at scale",
        benchmarks: IndustryBenchmarks {
            gross_margin: Some(65.0),
            net_margin: Some(15.0),
            roe: Some(15.0),
        },
        key_factors: &["recurring revenue share", "retention", "sales efficiency", "R&D productivity"],
        risks: &["competition", "customer concentration", "technology shifts"],
    },
];

/// Look up the profile for an industry label, falling back to the default
pub fn profile_for(industry: &str) -> &'static IndustryProfile {
    let needle = industry.trim().to_lowercase();
    PROFILES
        .iter()
        .find(|profile| profile.name == needle)
        .unwrap_or(&DEFAULT_PROFILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_industry() {
        let profile = profile_for("Banking");
        assert_eq!(profile.name, "banking");
        assert!(profile.benchmarks.gross_margin.is_none());
    }

    #[test]
    fn test_unknown_industry_falls_back() {
        let profile = profile_for("deep sea mining");
        assert_eq!(profile.name, "default");
    }

    #[test]
    fn test_default_keyword() {
        assert_eq!(profile_for("default").name, "default");
        assert_eq!(profile_for("").name, "default");
    }
}
