//! Alert configuration registry.
//!
//! Holds the alert configuration for every monitored (station, sensor type)
//! pair and answers the configuration lookups the evaluator depends on. This
//! is the single source of truth for thresholds: all other modules look
//! configurations up here rather than carrying their own copies.
//!
//! Thresholds are saved as a batch. Creating or updating a configuration
//! validates the whole batch first, and an update replaces the previous
//! thresholds wholesale.

use std::collections::HashSet;

use crate::model::{AlertConfiguration, ConfigError, Threshold};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Data for a configuration that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewAlertConfiguration {
    pub station_id: u64,
    pub station_name: Option<String>,
    pub sensor_type: String,
    pub sensor_unit: String,
    pub is_active: bool,
    pub thresholds: Vec<Threshold>,
}

/// Partial update of an existing configuration. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationUpdate {
    pub is_active: Option<bool>,
    /// Replacement threshold batch. Thresholds with `id == 0` get fresh ids.
    pub thresholds: Option<Vec<Threshold>>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates a threshold batch as it would be saved.
///
/// Rejects an empty batch, two thresholds at the same level, non-finite
/// numbers, `min >= max` when both bounds are set, and negative persistence
/// or tolerance.
pub fn validate_thresholds(thresholds: &[Threshold]) -> Result<(), ConfigError> {
    if thresholds.is_empty() {
        return Err(ConfigError::NoThresholds);
    }

    let mut seen = HashSet::new();
    for threshold in thresholds {
        if !seen.insert(threshold.level) {
            return Err(ConfigError::DuplicateLevel(threshold.level));
        }
    }

    for threshold in thresholds {
        let numbers = [
            threshold.min_value,
            threshold.max_value,
            threshold.tolerance,
            threshold.persistence_time,
        ];
        if numbers.iter().flatten().any(|n| !n.is_finite()) {
            return Err(ConfigError::NonFiniteValue(threshold.level));
        }
        if let (Some(min), Some(max)) = (threshold.min_value, threshold.max_value) {
            if min >= max {
                return Err(ConfigError::InvertedBounds(threshold.level));
            }
        }
        if threshold.persistence_time.is_some_and(|p| p < 0.0) {
            return Err(ConfigError::NegativePersistence(threshold.level));
        }
        if threshold.tolerance.is_some_and(|t| t < 0.0) {
            return Err(ConfigError::NegativeTolerance(threshold.level));
        }
    }

    Ok(())
}

fn validate_identity(station_id: u64, sensor_type: &str) -> Result<(), ConfigError> {
    if station_id == 0 {
        return Err(ConfigError::InvalidStationId);
    }
    if sensor_type.trim().is_empty() {
        return Err(ConfigError::MissingSensorType);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// In-memory store of alert configurations, one per (station, sensor type).
#[derive(Debug, Clone)]
pub struct AlertRegistry {
    configurations: Vec<AlertConfiguration>,
    next_configuration_id: u64,
    next_threshold_id: u64,
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self {
            configurations: Vec::new(),
            next_configuration_id: 1,
            next_threshold_id: 1,
        }
    }
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configurations loaded elsewhere (e.g. the
    /// config file), applying the same validation as [`create`].
    ///
    /// Configurations and thresholds keep their ids when non-zero; zero ids
    /// are assigned fresh ones.
    ///
    /// [`create`]: AlertRegistry::create
    pub fn from_configurations(
        configurations: Vec<AlertConfiguration>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.next_configuration_id = configurations.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        registry.next_threshold_id = configurations
            .iter()
            .flat_map(|c| c.thresholds.iter().map(|t| t.id))
            .max()
            .unwrap_or(0)
            + 1;

        let mut configuration_ids = HashSet::new();
        let mut threshold_ids = HashSet::new();
        for mut configuration in configurations {
            validate_identity(configuration.station_id, &configuration.sensor_type)?;
            validate_thresholds(&configuration.thresholds)?;
            registry.ensure_unconfigured(configuration.station_id, &configuration.sensor_type)?;

            if configuration.id != 0 && !configuration_ids.insert(configuration.id) {
                return Err(ConfigError::DuplicateConfigurationId(configuration.id));
            }
            for threshold in configuration.thresholds.iter().filter(|t| t.id != 0) {
                if !threshold_ids.insert(threshold.id) {
                    return Err(ConfigError::DuplicateThresholdId(threshold.id));
                }
            }

            if configuration.id == 0 {
                configuration.id = registry.take_configuration_id();
            }
            registry.assign_threshold_ids(&mut configuration.thresholds);
            registry.configurations.push(configuration);
        }

        Ok(registry)
    }

    /// Creates a configuration for a (station, sensor type) pair that has
    /// none yet.
    pub fn create(
        &mut self,
        request: NewAlertConfiguration,
    ) -> Result<&AlertConfiguration, ConfigError> {
        validate_identity(request.station_id, &request.sensor_type)?;
        validate_thresholds(&request.thresholds)?;
        self.ensure_unconfigured(request.station_id, &request.sensor_type)?;

        let mut thresholds = request.thresholds;
        self.assign_threshold_ids(&mut thresholds);
        let configuration = AlertConfiguration {
            id: self.take_configuration_id(),
            station_id: request.station_id,
            station_name: request.station_name,
            sensor_type: request.sensor_type,
            sensor_unit: request.sensor_unit,
            is_active: request.is_active,
            thresholds,
        };
        self.configurations.push(configuration);

        // Just pushed
        Ok(&self.configurations[self.configurations.len() - 1])
    }

    /// Applies `update` to configuration `id`. A new threshold batch is
    /// validated in full and replaces the old one.
    pub fn update(
        &mut self,
        id: u64,
        update: ConfigurationUpdate,
    ) -> Result<&AlertConfiguration, ConfigError> {
        if id == 0 {
            return Err(ConfigError::InvalidConfigurationId);
        }
        let index = self.index_of(id).ok_or(ConfigError::NotFound(id))?;

        let thresholds = match update.thresholds {
            Some(mut batch) => {
                validate_thresholds(&batch)?;
                self.assign_threshold_ids(&mut batch);
                Some(batch)
            }
            None => None,
        };

        let configuration = &mut self.configurations[index];
        if let Some(is_active) = update.is_active {
            configuration.is_active = is_active;
        }
        if let Some(batch) = thresholds {
            configuration.thresholds = batch;
        }
        Ok(&self.configurations[index])
    }

    /// Removes configuration `id` and returns it.
    pub fn delete(&mut self, id: u64) -> Result<AlertConfiguration, ConfigError> {
        if id == 0 {
            return Err(ConfigError::InvalidConfigurationId);
        }
        let index = self.index_of(id).ok_or(ConfigError::NotFound(id))?;
        Ok(self.configurations.remove(index))
    }

    pub fn all(&self) -> &[AlertConfiguration] {
        &self.configurations
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Looks up a configuration by id. Returns `None` if not found.
    pub fn find_by_id(&self, id: u64) -> Option<&AlertConfiguration> {
        self.configurations.iter().find(|c| c.id == id)
    }

    /// All configurations of one station, in creation order.
    pub fn find_by_station(&self, station_id: u64) -> Vec<&AlertConfiguration> {
        self.configurations
            .iter()
            .filter(|c| c.station_id == station_id)
            .collect()
    }

    /// The configuration for one (station, sensor type) stream.
    pub fn find_by_sensor(&self, station_id: u64, sensor_type: &str) -> Option<&AlertConfiguration> {
        self.configurations
            .iter()
            .find(|c| c.station_id == station_id && c.sensor_type == sensor_type)
    }

    /// Distinct station ids with at least one configuration, ascending.
    pub fn station_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.configurations.iter().map(|c| c.station_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn index_of(&self, id: u64) -> Option<usize> {
        self.configurations.iter().position(|c| c.id == id)
    }

    fn ensure_unconfigured(&self, station_id: u64, sensor_type: &str) -> Result<(), ConfigError> {
        if self.find_by_sensor(station_id, sensor_type).is_some() {
            return Err(ConfigError::AlreadyConfigured {
                station_id,
                sensor_type: sensor_type.to_string(),
            });
        }
        Ok(())
    }

    fn take_configuration_id(&mut self) -> u64 {
        let id = self.next_configuration_id;
        self.next_configuration_id += 1;
        id
    }

    fn assign_threshold_ids(&mut self, thresholds: &mut [Threshold]) {
        for threshold in thresholds.iter_mut().filter(|t| t.id == 0) {
            threshold.id = self.next_threshold_id;
            self.next_threshold_id += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SENSOR_PH, SENSOR_WATER_LEVEL, ThresholdLevel};

    fn bounded(level: ThresholdLevel, min: Option<f64>, max: Option<f64>) -> Threshold {
        Threshold {
            min_value: min,
            max_value: max,
            ..Threshold::new(0, level)
        }
    }

    fn water_level_request(station_id: u64) -> NewAlertConfiguration {
        NewAlertConfiguration {
            station_id,
            station_name: Some("Río Claro - Puente Norte".to_string()),
            sensor_type: SENSOR_WATER_LEVEL.to_string(),
            sensor_unit: "m".to_string(),
            is_active: true,
            thresholds: vec![
                bounded(ThresholdLevel::Warning, None, Some(2.5)),
                bounded(ThresholdLevel::Critical, None, Some(3.0)),
                bounded(ThresholdLevel::Emergency, None, Some(3.8)),
            ],
        }
    }

    // --- Validation ---------------------------------------------------------

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(matches!(validate_thresholds(&[]), Err(ConfigError::NoThresholds)));
    }

    #[test]
    fn test_duplicate_levels_are_rejected() {
        let batch = vec![
            bounded(ThresholdLevel::Warning, None, Some(2.0)),
            bounded(ThresholdLevel::Warning, None, Some(2.5)),
        ];
        let err = validate_thresholds(&batch).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateLevel(ThresholdLevel::Warning)));
        assert_eq!(err.to_string(), "No se pueden duplicar niveles de umbral");
    }

    #[test]
    fn test_min_must_be_below_max() {
        let batch = vec![bounded(ThresholdLevel::Critical, Some(3.0), Some(3.0))];
        let err = validate_thresholds(&batch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Valor mínimo debe ser menor al máximo para el nivel critical"
        );
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let nan_min = vec![bounded(ThresholdLevel::Critical, Some(f64::NAN), Some(3.0))];
        assert!(matches!(
            validate_thresholds(&nan_min),
            Err(ConfigError::NonFiniteValue(ThresholdLevel::Critical))
        ));

        let infinite_persistence = vec![Threshold {
            persistence_time: Some(f64::INFINITY),
            ..bounded(ThresholdLevel::Warning, None, Some(2.0))
        }];
        assert!(matches!(
            validate_thresholds(&infinite_persistence),
            Err(ConfigError::NonFiniteValue(ThresholdLevel::Warning))
        ));

        let nan_tolerance = vec![Threshold {
            tolerance: Some(f64::NAN),
            ..bounded(ThresholdLevel::Emergency, None, Some(4.0))
        }];
        let err = validate_thresholds(&nan_tolerance).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Los valores del umbral emergency deben ser números finitos"
        );
    }

    #[test]
    fn test_negative_persistence_is_rejected() {
        let batch = vec![Threshold {
            persistence_time: Some(-1.0),
            ..bounded(ThresholdLevel::Warning, None, Some(2.0))
        }];
        assert!(matches!(
            validate_thresholds(&batch),
            Err(ConfigError::NegativePersistence(ThresholdLevel::Warning))
        ));
    }

    #[test]
    fn test_zero_persistence_and_unbounded_thresholds_are_accepted() {
        // A threshold without bounds is allowed; it simply never fires.
        let batch = vec![
            Threshold {
                persistence_time: Some(0.0),
                ..bounded(ThresholdLevel::Warning, None, Some(2.0))
            },
            bounded(ThresholdLevel::Emergency, None, None),
        ];
        assert!(validate_thresholds(&batch).is_ok());
    }

    // --- Registry -----------------------------------------------------------

    #[test]
    fn test_create_assigns_ids() {
        let mut registry = AlertRegistry::new();
        let created = registry.create(water_level_request(1)).expect("valid request");
        assert_eq!(created.id, 1);
        let ids: Vec<u64> = created.thresholds.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_create_rejects_invalid_station_and_sensor() {
        let mut registry = AlertRegistry::new();
        assert!(matches!(
            registry.create(water_level_request(0)),
            Err(ConfigError::InvalidStationId)
        ));

        let mut request = water_level_request(1);
        request.sensor_type = "   ".to_string();
        assert!(matches!(registry.create(request), Err(ConfigError::MissingSensorType)));
    }

    #[test]
    fn test_second_configuration_for_same_sensor_is_rejected() {
        let mut registry = AlertRegistry::new();
        registry.create(water_level_request(1)).expect("first create");
        let err = registry.create(water_level_request(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Ya existe una configuración para el sensor water_level en esta estación"
        );
        // Other stations are unaffected.
        assert!(registry.create(water_level_request(2)).is_ok());
    }

    #[test]
    fn test_update_replaces_threshold_batch() {
        let mut registry = AlertRegistry::new();
        let id = registry.create(water_level_request(1)).expect("create").id;

        let update = ConfigurationUpdate {
            is_active: Some(false),
            thresholds: Some(vec![bounded(ThresholdLevel::Critical, None, Some(3.2))]),
        };
        let updated = registry.update(id, update).expect("valid update");
        assert!(!updated.is_active);
        assert_eq!(updated.thresholds.len(), 1);
        assert_eq!(updated.thresholds[0].max_value, Some(3.2));
        assert_eq!(updated.thresholds[0].id, 4, "new thresholds continue the id sequence");
    }

    #[test]
    fn test_invalid_update_leaves_configuration_untouched() {
        let mut registry = AlertRegistry::new();
        let id = registry.create(water_level_request(1)).expect("create").id;

        let update = ConfigurationUpdate {
            is_active: Some(false),
            thresholds: Some(vec![bounded(ThresholdLevel::Critical, Some(4.0), Some(3.0))]),
        };
        assert!(registry.update(id, update).is_err());

        let stored = registry.find_by_id(id).expect("still present");
        assert!(stored.is_active);
        assert_eq!(stored.thresholds.len(), 3);
    }

    #[test]
    fn test_update_and_delete_unknown_ids() {
        let mut registry = AlertRegistry::new();
        assert!(matches!(
            registry.update(0, ConfigurationUpdate::default()),
            Err(ConfigError::InvalidConfigurationId)
        ));
        assert!(matches!(
            registry.update(9, ConfigurationUpdate::default()),
            Err(ConfigError::NotFound(9))
        ));
        assert!(matches!(registry.delete(9), Err(ConfigError::NotFound(9))));
    }

    #[test]
    fn test_delete_frees_the_sensor_slot() {
        let mut registry = AlertRegistry::new();
        let id = registry.create(water_level_request(1)).expect("create").id;
        let removed = registry.delete(id).expect("delete");
        assert_eq!(removed.sensor_type, SENSOR_WATER_LEVEL);
        assert!(registry.find_by_sensor(1, SENSOR_WATER_LEVEL).is_none());
        assert!(registry.create(water_level_request(1)).is_ok());
    }

    #[test]
    fn test_lookups_by_station_and_sensor() {
        let mut registry = AlertRegistry::new();
        registry.create(water_level_request(1)).expect("create");
        let mut ph = water_level_request(1);
        ph.sensor_type = SENSOR_PH.to_string();
        ph.sensor_unit = "pH".to_string();
        ph.thresholds = vec![bounded(ThresholdLevel::Warning, Some(6.5), Some(8.5))];
        registry.create(ph).expect("create ph");
        registry.create(water_level_request(3)).expect("create station 3");

        assert_eq!(registry.find_by_station(1).len(), 2);
        assert_eq!(
            registry.find_by_sensor(1, SENSOR_PH).map(|c| c.sensor_unit.as_str()),
            Some("pH")
        );
        assert!(registry.find_by_sensor(3, SENSOR_PH).is_none());
        assert_eq!(registry.station_ids(), vec![1, 3]);
    }

    #[test]
    fn test_from_configurations_keeps_ids_and_continues_sequence() {
        let loaded = AlertConfiguration {
            id: 10,
            station_id: 1,
            station_name: None,
            sensor_type: SENSOR_WATER_LEVEL.to_string(),
            sensor_unit: "m".to_string(),
            is_active: true,
            thresholds: vec![Threshold {
                id: 40,
                ..bounded(ThresholdLevel::Critical, None, Some(3.0))
            }],
        };
        let mut registry = AlertRegistry::from_configurations(vec![loaded]).expect("valid");
        let created = registry.create(water_level_request(2)).expect("create");
        assert_eq!(created.id, 11);
        assert_eq!(created.thresholds[0].id, 41);
    }

    #[test]
    fn test_from_configurations_rejects_duplicates() {
        let make = |id| AlertConfiguration {
            id,
            station_id: 1,
            station_name: None,
            sensor_type: SENSOR_WATER_LEVEL.to_string(),
            sensor_unit: "m".to_string(),
            is_active: true,
            thresholds: vec![bounded(ThresholdLevel::Critical, None, Some(3.0))],
        };
        assert!(matches!(
            AlertRegistry::from_configurations(vec![make(1), make(2)]),
            Err(ConfigError::AlreadyConfigured { station_id: 1, .. })
        ));
    }

    #[test]
    fn test_from_configurations_rejects_repeated_ids() {
        let make = |id, station_id, threshold_id| AlertConfiguration {
            id,
            station_id,
            station_name: None,
            sensor_type: SENSOR_WATER_LEVEL.to_string(),
            sensor_unit: "m".to_string(),
            is_active: true,
            thresholds: vec![Threshold {
                id: threshold_id,
                ..bounded(ThresholdLevel::Critical, None, Some(3.0))
            }],
        };
        assert!(matches!(
            AlertRegistry::from_configurations(vec![make(5, 1, 0), make(5, 2, 0)]),
            Err(ConfigError::DuplicateConfigurationId(5))
        ));
        assert!(matches!(
            AlertRegistry::from_configurations(vec![make(1, 1, 9), make(2, 2, 9)]),
            Err(ConfigError::DuplicateThresholdId(9))
        ));

        let registry = AlertRegistry::from_configurations(vec![make(0, 1, 0), make(0, 2, 0)])
            .expect("zero ids are assigned, not compared");
        assert_eq!(registry.len(), 2);
    }
}
