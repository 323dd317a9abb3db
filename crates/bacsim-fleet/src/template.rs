//! Declarative device-type templates.
//!
//! A template table maps a device-type tag to the objects every device of
//! that type hosts. Each [`ObjectTemplate`] is expanded
//! `objects_per_template` times when a device is built; the expansion index
//! `i` feeds the object name, the instance number and the initial value.

use bacsim_core::types::{EngineeringUnits, ObjectType};
use std::collections::BTreeMap;

/// Device types of the built-in table, in the order the default cycle uses.
pub const PROTOTYPE_DEVICE_TYPES: [&str; 13] = [
    "controller",
    "router",
    "gateway",
    "workstation",
    "sensor",
    "actuator",
    "meter",
    "application-specific",
    "lighting-controller",
    "fire-alarm-panel",
    "access-control",
    "smart-sensor",
    "smart-actuator",
];

/// Single-type table entry mirroring the BACpypes stimulator device.
pub const STIMULATOR_DEVICE_TYPE: &str = "stimulator";

/// Initial present-value rule, evaluated with the expansion index `i`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "kebab-case")
)]
pub enum InitialValue {
    /// `base + step * i`
    Analog { base: f32, step: f32 },
    /// `(i + offset) % 2`
    Binary { offset: u32 },
    /// Fixed state out of `states`.
    MultiState { value: u32, states: u32 },
}

impl InitialValue {
    pub fn analog(base: f32, step: f32) -> Self {
        Self::Analog { base, step }
    }

    pub fn binary(offset: u32) -> Self {
        Self::Binary { offset }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectTemplate {
    pub object_type: ObjectType,
    /// Name prefix; the expansion index is appended.
    pub name: String,
    pub initial: InitialValue,
    #[cfg_attr(feature = "serde", serde(default))]
    pub units: Option<u32>,
}

impl ObjectTemplate {
    pub fn new(object_type: ObjectType, name: impl Into<String>, initial: InitialValue) -> Self {
        Self {
            object_type,
            name: name.into(),
            initial,
            units: None,
        }
    }

    pub fn with_units(mut self, units: EngineeringUnits) -> Self {
        self.units = Some(units.to_u32());
        self
    }

    pub fn object_name(&self, index: u32) -> String {
        format!("{}{}", self.name, index)
    }
}

/// Device-type tag to object templates.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct TemplateTable {
    types: BTreeMap<String, Vec<ObjectTemplate>>,
}

impl TemplateTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The prototype fleet's device types plus [`STIMULATOR_DEVICE_TYPE`].
    pub fn builtin() -> Self {
        use InitialValue as V;
        use ObjectType::*;

        let generic = vec![
            ObjectTemplate::new(AnalogInput, "AI", V::analog(20.0, 1.0))
                .with_units(EngineeringUnits::NoUnits),
            ObjectTemplate::new(AnalogOutput, "AO", V::analog(10.0, 1.0))
                .with_units(EngineeringUnits::NoUnits),
            ObjectTemplate::new(BinaryInput, "BI", V::binary(0)),
            ObjectTemplate::new(BinaryOutput, "BO", V::binary(1)),
        ];
        let sensor = vec![
            ObjectTemplate::new(AnalogInput, "TempSensor", V::analog(22.5, 1.0))
                .with_units(EngineeringUnits::DegreesCelsius),
            ObjectTemplate::new(AnalogInput, "HumiditySensor", V::analog(50.0, 1.0))
                .with_units(EngineeringUnits::PercentRelativeHumidity),
        ];
        let actuator = vec![
            ObjectTemplate::new(BinaryOutput, "Valve", V::binary(0)),
            ObjectTemplate::new(AnalogOutput, "Damper", V::analog(5.0, 1.0))
                .with_units(EngineeringUnits::Percent),
        ];
        let infrastructure = vec![ObjectTemplate::new(
            AnalogValue,
            "ConnectedDevice",
            V::analog(1000.0, 1.0),
        )
        .with_units(EngineeringUnits::NoUnits)];

        let mut table = Self::empty();
        table.insert("controller", generic.clone());
        table.insert("application-specific", generic);
        table.insert("sensor", sensor.clone());
        table.insert("smart-sensor", sensor);
        table.insert("actuator", actuator.clone());
        table.insert("smart-actuator", actuator);
        table.insert(
            "meter",
            vec![
                ObjectTemplate::new(AnalogInput, "Energy", V::analog(1000.0, 100.0))
                    .with_units(EngineeringUnits::KilowattHours),
                ObjectTemplate::new(AnalogInput, "Water", V::analog(200.0, 10.0))
                    .with_units(EngineeringUnits::CubicMeters),
            ],
        );
        table.insert(
            "lighting-controller",
            vec![ObjectTemplate::new(BinaryOutput, "Light", V::binary(0))],
        );
        table.insert(
            "fire-alarm-panel",
            vec![
                ObjectTemplate::new(BinaryInput, "Smoke", V::binary(0)),
                ObjectTemplate::new(BinaryInput, "Heat", V::binary(1)),
            ],
        );
        table.insert(
            "access-control",
            vec![
                ObjectTemplate::new(BinaryInput, "Door", V::binary(0)),
                ObjectTemplate::new(BinaryOutput, "Lock", V::binary(1)),
            ],
        );
        table.insert("router", infrastructure.clone());
        table.insert("gateway", infrastructure.clone());
        table.insert("workstation", infrastructure);
        table.insert(
            STIMULATOR_DEVICE_TYPE,
            vec![
                ObjectTemplate::new(AnalogInput, "AI", V::analog(20.0, 1.0))
                    .with_units(EngineeringUnits::NoUnits),
                ObjectTemplate::new(AnalogOutput, "AO", V::analog(10.0, 1.0))
                    .with_units(EngineeringUnits::NoUnits),
                ObjectTemplate::new(AnalogValue, "AV", V::analog(5.0, 1.0))
                    .with_units(EngineeringUnits::NoUnits),
                ObjectTemplate::new(BinaryInput, "BI", V::Binary { offset: 1 }),
                ObjectTemplate::new(BinaryOutput, "BO", V::Binary { offset: 0 }),
                ObjectTemplate::new(BinaryValue, "BV", V::Binary { offset: 1 }),
                ObjectTemplate::new(
                    MultiStateInput,
                    "MSI",
                    V::MultiState {
                        value: 1,
                        states: 3,
                    },
                ),
                ObjectTemplate::new(
                    MultiStateOutput,
                    "MSO",
                    V::MultiState {
                        value: 2,
                        states: 3,
                    },
                ),
                ObjectTemplate::new(
                    MultiStateValue,
                    "MSV",
                    V::MultiState {
                        value: 3,
                        states: 3,
                    },
                ),
            ],
        );
        table
    }

    pub fn insert(&mut self, device_type: impl Into<String>, objects: Vec<ObjectTemplate>) {
        self.types.insert(device_type.into(), objects);
    }

    pub fn get(&self, device_type: &str) -> Option<&[ObjectTemplate]> {
        self.types.get(device_type).map(Vec::as_slice)
    }

    pub fn contains(&self, device_type: &str) -> bool {
        self.types.contains_key(device_type)
    }

    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
