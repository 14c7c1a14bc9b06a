use crate::*;

pub const DEFAULT_WIRES: [&str; 16] = [
    "H1_L_0", "H1_L_1", "H2_L_0", "H4_L_0", "H6_L_0", "H1_R_0", "H1_R_1", "H2_R_0", "H4_R_0",
    "H6_R_0", "V1_D_0", "V1_D_1", "V4_D_0", "V1_U_0", "V1_U_1", "V4_U_0",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthOrder {
    #[default]
    Free,
    /// Same-axis switches never move onto a longer wire.
    NonIncreasing,
    /// Same-axis switches never move onto a shorter wire.
    NonDecreasing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniformFan {
    #[default]
    Off,
    /// One shared value for every wire.
    Global,
    /// One value for H wires and one for V wires.
    WithinAxis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveKind {
    #[default]
    MaxUsage,
    MinSwitches,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeIndicator {
    /// `Σ switches - Σ size·ind = 0` with exactly one indicator per wire.
    #[default]
    Weighted,
    /// Each indicator is tied to its size through an exact equality test.
    Exact,
}

/// Every knob of a synthesis run. Unset fields take the values of the reference template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct SynthConfig {
    #[builder(default = DEFAULT_WIRES.iter().map(|w| w.to_string()).collect())]
    pub wires: Vec<String>,
    #[builder(default = 1)]
    pub max_depth: i32,
    #[builder(default)]
    pub geometry: MuxGeometry,

    #[builder(default = true)]
    pub enforce_hop_optimality: bool,
    #[builder(default = true)]
    pub enforce_fanin: bool,
    #[builder(default = true)]
    pub enforce_fanout: bool,
    #[builder(default = 6)]
    pub fanin: u32,
    #[builder(default = 6)]
    pub fanout: u32,
    #[builder(default)]
    pub enforce_external_symmetry: bool,
    #[builder(default)]
    pub enforce_internal_symmetry: bool,
    #[builder(default)]
    pub enforce_continuation: bool,
    #[builder(default)]
    pub enforce_relaxed_continuation: bool,
    #[builder(default)]
    pub enforce_two_turns: bool,
    #[builder(default)]
    pub enforce_one_turn: bool,
    /// Number of distinct multiplexer sizes allowed; 0 disables the bound.
    #[builder(default = 1)]
    pub limit_mux_size_number: u32,
    /// Number of distinct fanout sizes allowed; 0 disables the bound.
    #[builder(default = 1)]
    pub limit_fanout_size_number: u32,
    #[builder(default = (0..=20).collect())]
    pub allowed_mux_sizes: Vec<u32>,
    #[builder(default = (0..=20).collect())]
    pub allowed_fanout_sizes: Vec<u32>,
    #[builder(default)]
    pub size_indicator: SizeIndicator,
    /// Upper bound on the pattern size; 0 means unlimited.
    #[builder(default = 96)]
    pub max_switch_number: u32,
    /// Minimum shared inputs of each multiplexer with some partner; 0 disables.
    #[builder(default)]
    pub mux_pair_input_share: u32,

    #[builder(default)]
    pub uniform_fanin: UniformFan,
    #[builder(default)]
    pub uniform_fanout: UniformFan,
    #[builder(default)]
    pub length_order: LengthOrder,
    #[builder(default)]
    pub prohibit_opposite: bool,
    #[builder(default)]
    pub prohibit_nonselected: bool,
    #[builder(default = 2)]
    pub preselect_mult: u32,
    /// Maximum depth replicas of one (driver, target) pair; 0 disables.
    #[builder(default)]
    pub limit_lut_offset_replicas: u32,
    #[builder(default = true)]
    pub force_adopted: bool,

    #[builder(default)]
    pub objective: ObjectiveKind,
    /// 0 maximizes usage only, 1 minimizes wirelength only.
    #[builder(default = 0.0)]
    pub wl_tradeoff: f64,
    #[builder(default)]
    pub fanout_centering: bool,
    #[builder(default = 0.01)]
    pub centering_weight: f64,
    #[builder(default)]
    pub placement_radius: i32,
    /// Relative Euclidean distance of an approximated usage vector; 0 keeps the log as is.
    #[builder(default = 0.0)]
    pub approximate_usage: f64,

    #[builder(default = 19225)]
    pub floorplan_seed: u64,
    #[builder(default = 19225)]
    pub usage_seed: u64,
    #[builder(default = 100)]
    pub index_threshold: usize,
    #[builder(default)]
    pub lazy_hop_rows: bool,
    #[builder(default = (12, 8))]
    pub solve_window: Coord,
    #[builder(default = (50, 50))]
    pub verify_window: Coord,
    #[builder(default)]
    pub lp_relax: bool,
    #[builder(default = 3600)]
    pub solver_time_limit: u64,
    #[builder(default = 5)]
    pub max_rounds: usize,
    #[builder(default = 0.001)]
    pub tolerance: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SynthConfig {
    pub fn load(path: &Path) -> Result<Self> {
        file_save::load_json_from(path).map_err(|e| SynthError::serde(path, e))
    }

    /// Applies the dominance rules and validates the result.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let mut c = self.clone();
        if c.enforce_two_turns && c.enforce_one_turn {
            debug!("two turns dominate one turn");
            c.enforce_one_turn = false;
        }
        if c.enforce_continuation && c.enforce_relaxed_continuation {
            debug!("continuation dominates relaxed continuation");
            c.enforce_relaxed_continuation = false;
        }
        if c.enforce_fanin {
            c.limit_mux_size_number = 0;
            c.max_switch_number = 0;
        }
        if c.enforce_fanout {
            c.limit_fanout_size_number = 0;
            c.max_switch_number = 0;
        }
        if !(self.enforce_fanin || self.enforce_fanout) && self.max_switch_number == 0 {
            return Err(SynthError::InvalidConfig(
                "neither fanin nor fanout is bound and the switch count is unlimited".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.wl_tradeoff) {
            return Err(SynthError::InvalidConfig(format!(
                "wl_tradeoff must lie in [0, 1], got {}",
                c.wl_tradeoff
            )));
        }
        if c.approximate_usage < 0.0 {
            return Err(SynthError::InvalidConfig(
                "approximate_usage must be nonnegative".into(),
            ));
        }
        if c.max_depth < 0 {
            return Err(SynthError::InvalidConfig("max_depth must be nonnegative".into()));
        }
        if c.limit_mux_size_number > 0 && c.allowed_mux_sizes.is_empty()
            || c.limit_fanout_size_number > 0 && c.allowed_fanout_sizes.is_empty()
        {
            return Err(SynthError::InvalidConfig(
                "a size limit needs at least one allowed size".into(),
            ));
        }
        let alphabet = WireAlphabet::parse(&c.wires)?;
        Ok(ResolvedConfig {
            inner: c,
            alphabet,
        })
    }
}

/// Configuration after dominance rules; immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    inner: SynthConfig,
    alphabet: WireAlphabet,
}

impl ResolvedConfig {
    pub fn alphabet(&self) -> &WireAlphabet {
        &self.alphabet
    }
    pub fn raw(&self) -> &SynthConfig {
        &self.inner
    }
    pub fn universe(&self) -> SwitchUniverse {
        SwitchUniverse::new(self.alphabet.clone(), self.inner.max_depth)
    }
    pub fn grid(&self) -> MuxGrid {
        MuxGrid::new(&self.inner.geometry, self.alphabet.len())
    }
    pub fn multi_round(&self) -> bool {
        self.inner.wl_tradeoff > 0.0
    }
}

impl std::ops::Deref for ResolvedConfig {
    type Target = SynthConfig;
    fn deref(&self) -> &SynthConfig {
        &self.inner
    }
}
