use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::roadmap::MAX_LEVEL_COUNT;

pub const CTF_CATEGORY: &str = "CTFs";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub start_node_id: String,
    pub ctf_points: u32,
    pub categories: Vec<String>,
    pub level_count: usize,
    pub notification_delay_ms: u64,
    pub unlock_percent: u8,
    pub forces: ForceConfig,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForceConfig {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub major_collision_radius: f32,
    pub minor_collision_radius: f32,
    pub collision_strength: f32,
    pub reheat_alpha: f32,
    pub velocity_decay: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_node_id: "Start".to_owned(),
            ctf_points: 30,
            categories: [
                "Scripting and Automation",
                "System Analysis",
                CTF_CATEGORY,
                "Defensive Techniques",
                "Offensive Techniques",
                "Web and Network Analysis",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            level_count: 49,
            notification_delay_ms: 200,
            unlock_percent: 50,
            forces: ForceConfig::default(),
        }
    }
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            link_distance: 150.0,
            charge_strength: 700.0,
            major_collision_radius: 45.0,
            minor_collision_radius: 25.0,
            collision_strength: 0.7,
            reheat_alpha: 0.3,
            velocity_decay: 0.4,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_node_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "start_node_id",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.unlock_percent > 100 {
            return Err(ConfigError::Invalid {
                field: "unlock_percent",
                reason: format!("{} is above 100", self.unlock_percent),
            });
        }
        if self.level_count > MAX_LEVEL_COUNT {
            return Err(ConfigError::Invalid {
                field: "level_count",
                reason: format!("{} is above {MAX_LEVEL_COUNT}", self.level_count),
            });
        }
        self.forces.validate()
    }

    pub fn notification_delay(&self) -> Duration {
        Duration::from_millis(self.notification_delay_ms)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be positive"),
        })
    }
}

impl ForceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("forces.link_distance", self.link_distance)?;
        positive("forces.charge_strength", self.charge_strength)?;
        positive("forces.major_collision_radius", self.major_collision_radius)?;
        positive("forces.minor_collision_radius", self.minor_collision_radius)?;
        positive("forces.collision_strength", self.collision_strength)?;
        positive("forces.reheat_alpha", self.reheat_alpha)?;
        if self.reheat_alpha > 1.0 {
            return Err(ConfigError::Invalid {
                field: "forces.reheat_alpha",
                reason: format!("{} is above 1", self.reheat_alpha),
            });
        }
        if !(0.0..1.0).contains(&self.velocity_decay) {
            return Err(ConfigError::Invalid {
                field: "forces.velocity_decay",
                reason: format!("{} is outside [0, 1)", self.velocity_decay),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            ctf_points = 40

            [forces]
            link_distance = 120.0
            "#,
        )
        .unwrap();

        assert_eq!(config.ctf_points, 40);
        assert_eq!(config.start_node_id, "Start");
        assert_eq!(config.forces.link_distance, 120.0);
        assert_eq!(config.forces.charge_strength, 700.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unlock_percent_above_hundred() {
        let config = EngineConfig {
            unlock_percent: 120,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "unlock_percent",
                ..
            })
        ));
    }

    fn rejected_field(config: &EngineConfig) -> Option<&'static str> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn rejects_non_positive_forces() {
        let cases: [(&str, fn(&mut ForceConfig)); 7] = [
            ("forces.link_distance", |forces| forces.link_distance = 0.0),
            ("forces.charge_strength", |forces| forces.charge_strength = -700.0),
            ("forces.major_collision_radius", |forces| {
                forces.major_collision_radius = f32::NAN
            }),
            ("forces.minor_collision_radius", |forces| forces.minor_collision_radius = 0.0),
            ("forces.collision_strength", |forces| {
                forces.collision_strength = f32::INFINITY
            }),
            ("forces.reheat_alpha", |forces| forces.reheat_alpha = 0.0),
            ("forces.velocity_decay", |forces| forces.velocity_decay = 1.0),
        ];

        for (field, breaks) in cases {
            let mut config = EngineConfig::default();
            breaks(&mut config.forces);
            assert_eq!(rejected_field(&config), Some(field));
        }
    }

    #[test]
    fn reheat_alpha_stays_within_one() {
        let mut config = EngineConfig::default();
        config.forces.reheat_alpha = 1.5;
        assert_eq!(rejected_field(&config), Some("forces.reheat_alpha"));
    }

    #[test]
    fn rejects_oversized_level_count() {
        let config = EngineConfig {
            level_count: usize::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(rejected_field(&config), Some("level_count"));

        let small = EngineConfig {
            level_count: 3,
            ..EngineConfig::default()
        };
        assert_eq!(rejected_field(&small), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = toml::from_str::<EngineConfig>("ctf_point = 3");
        assert!(parsed.is_err());
    }
}
