use macadam_streets::Mode;

/// Per-query routing profile: origin, departure time, speeds, and limits.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProfileRequest {
    pub from_lat: f64,
    pub from_lon: f64,
    /// Seconds since midnight.
    pub from_time: u32,
    pub walk_speed_mps: f32,
    pub bike_speed_mps: f32,
    /// Used only where an edge carries no speed of its own.
    pub car_speed_mps: f32,
    pub max_walk_time_s: u32,
    pub max_bike_time_s: u32,
    pub modes: Vec<Mode>,
}

impl Default for ProfileRequest {
    fn default() -> Self {
        Self {
            from_lat: 0.0,
            from_lon: 0.0,
            from_time: 8 * 3600,
            walk_speed_mps: 1.3,
            bike_speed_mps: 4.0,
            car_speed_mps: 0.0,
            max_walk_time_s: 3600,
            max_bike_time_s: 3600,
            modes: vec![Mode::Walk],
        }
    }
}

impl ProfileRequest {
    pub fn speed_for(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Walk => f64::from(self.walk_speed_mps),
            Mode::Bicycle => f64::from(self.bike_speed_mps),
            Mode::Car => f64::from(self.car_speed_mps),
        }
    }
}
