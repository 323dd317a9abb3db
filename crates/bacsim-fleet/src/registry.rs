//! In-memory device registry.
//!
//! The set of devices is fixed once the fleet is built; only property
//! values change afterwards. Every device guards its objects with its own
//! [`tokio::sync::RwLock`], so traffic for one device never waits on
//! another.

use crate::config::{DevicePlan, FleetConfig};
use crate::error::RegistryError;
use crate::snapshot::{DeviceSummary, ObjectSummary};
use crate::template::{InitialValue, ObjectTemplate};
use crate::value::PropertyValue;
use bacsim_core::types::{EngineeringUnits, ObjectId, ObjectType, PropertyId, Segmentation};
use bacsim_core::MAX_APDU_LEN;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Number of slots in a commandable object's priority array.
pub const PRIORITY_LEVELS: usize = 16;
/// Priority used when a write names none.
pub const DEFAULT_WRITE_PRIORITY: u8 = 16;

const PROTOCOL_VERSION: u32 = 1;
const PROTOCOL_REVISION: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadOnly,
    Writable,
    /// Present-value of input objects.
    WhenOutOfService,
}

#[derive(Debug, Clone)]
struct Property {
    value: PropertyValue,
    access: Access,
}

#[derive(Debug, Clone)]
struct SimObject {
    object_type: ObjectType,
    number_of_states: Option<u32>,
    properties: BTreeMap<PropertyId, Property>,
    /// Present only for commandable objects.
    priority_array: Option<[Option<PropertyValue>; PRIORITY_LEVELS]>,
}

impl SimObject {
    fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            number_of_states: None,
            properties: BTreeMap::new(),
            priority_array: None,
        }
    }

    fn set(&mut self, property: PropertyId, value: PropertyValue, access: Access) {
        self.properties.insert(property, Property { value, access });
    }

    fn from_template(id: ObjectId, template: &ObjectTemplate, index: u32) -> Self {
        let object_type = id.object_type();
        let mut object = Self::new(object_type);
        object.set(
            PropertyId::ObjectIdentifier,
            PropertyValue::ObjectId(id),
            Access::ReadOnly,
        );
        object.set(
            PropertyId::ObjectName,
            PropertyValue::CharacterString(template.object_name(index)),
            Access::ReadOnly,
        );
        object.set(
            PropertyId::ObjectType,
            PropertyValue::Enumerated(u32::from(object_type.to_u16())),
            Access::ReadOnly,
        );
        object.set(
            PropertyId::EventState,
            PropertyValue::Enumerated(0),
            Access::ReadOnly,
        );
        object.set(
            PropertyId::OutOfService,
            PropertyValue::Boolean(false),
            Access::Writable,
        );
        object.set(
            PropertyId::Description,
            PropertyValue::CharacterString(String::new()),
            Access::Writable,
        );

        let initial = match template.initial {
            InitialValue::Analog { base, step } => PropertyValue::Real(base + step * index as f32),
            InitialValue::Binary { offset } => PropertyValue::Enumerated((index + offset) % 2),
            InitialValue::MultiState { value, states } => {
                object.number_of_states = Some(states);
                object.set(
                    PropertyId::NumberOfStates,
                    PropertyValue::Unsigned(states),
                    Access::ReadOnly,
                );
                PropertyValue::Unsigned(value)
            }
        };
        match object_type {
            ObjectType::AnalogInput | ObjectType::AnalogOutput | ObjectType::AnalogValue => {
                let units = template
                    .units
                    .unwrap_or(EngineeringUnits::NoUnits.to_u32());
                object.set(
                    PropertyId::Units,
                    PropertyValue::Enumerated(units),
                    Access::ReadOnly,
                );
            }
            ObjectType::BinaryInput | ObjectType::BinaryOutput => {
                object.set(
                    PropertyId::Polarity,
                    PropertyValue::Enumerated(0),
                    Access::ReadOnly,
                );
            }
            _ => {}
        }

        if object_type.is_commandable() {
            object.priority_array = Some(Default::default());
            object.set(PropertyId::RelinquishDefault, initial, Access::Writable);
        } else if object_type.is_input() {
            object.set(PropertyId::PresentValue, initial, Access::WhenOutOfService);
        } else {
            object.set(PropertyId::PresentValue, initial, Access::Writable);
        }
        object
    }

    fn out_of_service(&self) -> bool {
        matches!(
            self.properties.get(&PropertyId::OutOfService),
            Some(Property {
                value: PropertyValue::Boolean(true),
                ..
            })
        )
    }

    fn stored(&self, property: PropertyId) -> Result<&PropertyValue, RegistryError> {
        self.properties
            .get(&property)
            .map(|p| &p.value)
            .ok_or(RegistryError::UnknownProperty(property))
    }

    fn present_value(&self) -> Result<PropertyValue, RegistryError> {
        match &self.priority_array {
            Some(slots) => match slots.iter().flatten().next() {
                Some(active) => Ok(active.clone()),
                None => self.stored(PropertyId::RelinquishDefault).cloned(),
            },
            None => self.stored(PropertyId::PresentValue).cloned(),
        }
    }

    fn read(
        &self,
        property: PropertyId,
        object_list: &[ObjectId],
    ) -> Result<PropertyValue, RegistryError> {
        match property {
            PropertyId::PresentValue if self.object_type != ObjectType::Device => {
                self.present_value()
            }
            PropertyId::PriorityArray => match &self.priority_array {
                Some(slots) => Ok(PropertyValue::List(
                    slots
                        .iter()
                        .map(|slot| slot.clone().unwrap_or(PropertyValue::Null))
                        .collect(),
                )),
                None => Err(RegistryError::UnknownProperty(property)),
            },
            PropertyId::StatusFlags if self.object_type != ObjectType::Device => {
                // in-alarm, fault, overridden, out-of-service
                let flags = if self.out_of_service() { 0b0001_0000 } else { 0 };
                Ok(PropertyValue::BitString {
                    unused_bits: 4,
                    data: vec![flags],
                })
            }
            PropertyId::ObjectList if self.object_type == ObjectType::Device => Ok(
                PropertyValue::List(object_list.iter().copied().map(PropertyValue::ObjectId).collect()),
            ),
            other => self.stored(other).cloned(),
        }
    }

    fn access(&self, property: PropertyId) -> Result<Access, RegistryError> {
        let computed = match property {
            PropertyId::PriorityArray => self.priority_array.is_some(),
            PropertyId::StatusFlags => self.object_type != ObjectType::Device,
            PropertyId::ObjectList => self.object_type == ObjectType::Device,
            PropertyId::PresentValue => self.priority_array.is_some(),
            _ => false,
        };
        if computed {
            return Ok(if property == PropertyId::PresentValue {
                Access::Writable
            } else {
                Access::ReadOnly
            });
        }
        self.properties
            .get(&property)
            .map(|p| p.access)
            .ok_or(RegistryError::UnknownProperty(property))
    }

    fn write(
        &mut self,
        property: PropertyId,
        array_index: Option<u32>,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), RegistryError> {
        match self.access(property)? {
            Access::ReadOnly => return Err(RegistryError::WriteAccessDenied),
            Access::WhenOutOfService if !self.out_of_service() => {
                return Err(RegistryError::WriteAccessDenied)
            }
            _ => {}
        }
        if array_index.is_some() {
            return Err(RegistryError::PropertyIsNotAnArray);
        }
        let priority = priority.unwrap_or(DEFAULT_WRITE_PRIORITY);
        if !(1..=PRIORITY_LEVELS as u8).contains(&priority) {
            return Err(RegistryError::ValueOutOfRange);
        }

        match property {
            PropertyId::PresentValue => {
                if let Some(slots) = self.priority_array.as_mut() {
                    let slot = &mut slots[usize::from(priority - 1)];
                    if value == PropertyValue::Null {
                        *slot = None;
                        return Ok(());
                    }
                    check_present_value(self.object_type, self.number_of_states, &value)?;
                    *slot = Some(value);
                    return Ok(());
                }
                check_present_value(self.object_type, self.number_of_states, &value)?;
            }
            PropertyId::RelinquishDefault => {
                check_present_value(self.object_type, self.number_of_states, &value)?;
            }
            other => {
                if !self.stored(other)?.same_type(&value) {
                    return Err(RegistryError::InvalidDataType);
                }
            }
        }
        if let Some(p) = self.properties.get_mut(&property) {
            p.value = value;
        }
        Ok(())
    }
}

fn check_present_value(
    object_type: ObjectType,
    number_of_states: Option<u32>,
    value: &PropertyValue,
) -> Result<(), RegistryError> {
    match (object_type, value) {
        (
            ObjectType::AnalogInput | ObjectType::AnalogOutput | ObjectType::AnalogValue,
            PropertyValue::Real(_),
        ) => Ok(()),
        (
            ObjectType::BinaryInput | ObjectType::BinaryOutput | ObjectType::BinaryValue,
            PropertyValue::Enumerated(v),
        ) => match v {
            0 | 1 => Ok(()),
            _ => Err(RegistryError::ValueOutOfRange),
        },
        (
            ObjectType::MultiStateInput
            | ObjectType::MultiStateOutput
            | ObjectType::MultiStateValue,
            PropertyValue::Unsigned(v),
        ) => {
            if *v >= 1 && *v <= number_of_states.unwrap_or(0) {
                Ok(())
            } else {
                Err(RegistryError::ValueOutOfRange)
            }
        }
        _ => Err(RegistryError::InvalidDataType),
    }
}

fn select_element(
    property: PropertyId,
    value: PropertyValue,
    array_index: Option<u32>,
) -> Result<PropertyValue, RegistryError> {
    let Some(index) = array_index else {
        return Ok(value);
    };
    let items = match value {
        PropertyValue::List(items)
            if matches!(property, PropertyId::ObjectList | PropertyId::PriorityArray) =>
        {
            items
        }
        _ => return Err(RegistryError::PropertyIsNotAnArray),
    };
    if index == 0 {
        return Ok(PropertyValue::Unsigned(items.len() as u32));
    }
    items
        .into_iter()
        .nth(index as usize - 1)
        .ok_or(RegistryError::InvalidArrayIndex)
}

#[derive(Debug)]
struct DeviceState {
    device: SimObject,
    objects: BTreeMap<ObjectId, SimObject>,
    /// Object-list order: the device object first, then creation order.
    order: Vec<ObjectId>,
}

/// One simulated BACnet device: immutable identity plus lock-guarded
/// object state.
#[derive(Debug)]
pub struct SimulatedDevice {
    instance: u32,
    name: String,
    device_type: String,
    address: SocketAddr,
    vendor_id: u16,
    state: RwLock<DeviceState>,
}

impl SimulatedDevice {
    /// Builds a device from its plan, expanding the templates of its type.
    pub fn from_plan(plan: &DevicePlan, config: &FleetConfig, address: SocketAddr) -> Self {
        let device_id = ObjectId::device(plan.instance);
        let name = format!("{}{}", config.device_name_prefix, plan.instance);
        let device = device_object(device_id, &name, &plan.device_type, config);

        let templates = config.templates.get(&plan.device_type).unwrap_or(&[]);
        let mut next_instance: HashMap<ObjectType, u32> = HashMap::new();
        let mut objects = BTreeMap::new();
        let mut order = vec![device_id];
        for index in 0..config.objects_per_template {
            for template in templates {
                let counter = next_instance.entry(template.object_type).or_insert(0);
                let id = ObjectId::new(template.object_type, *counter);
                *counter += 1;
                objects.insert(id, SimObject::from_template(id, template, index));
                order.push(id);
            }
        }

        Self {
            instance: plan.instance,
            name,
            device_type: plan.device_type.clone(),
            address,
            vendor_id: config.vendor_id,
            state: RwLock::new(DeviceState {
                device,
                objects,
                order,
            }),
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::device(self.instance)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    /// The device itself may also be named with the wildcard instance.
    fn is_self(&self, object_id: ObjectId) -> bool {
        object_id.object_type() == ObjectType::Device
            && (object_id.instance() == self.instance
                || object_id.instance() == ObjectId::WILDCARD_INSTANCE)
    }

    pub async fn read_property(
        &self,
        object_id: ObjectId,
        property: PropertyId,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, RegistryError> {
        let state = self.state.read().await;
        let object = if self.is_self(object_id) {
            &state.device
        } else {
            state
                .objects
                .get(&object_id)
                .ok_or(RegistryError::UnknownObject(object_id))?
        };
        let value = object.read(property, &state.order)?;
        select_element(property, value, array_index)
    }

    pub async fn write_property(
        &self,
        object_id: ObjectId,
        property: PropertyId,
        array_index: Option<u32>,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        let object = if self.is_self(object_id) {
            &mut state.device
        } else {
            state
                .objects
                .get_mut(&object_id)
                .ok_or(RegistryError::UnknownObject(object_id))?
        };
        object.write(property, array_index, value, priority)
    }

    pub async fn summary(&self) -> DeviceSummary {
        let state = self.state.read().await;
        let objects = state
            .order
            .iter()
            .filter_map(|id| state.objects.get(id).map(|object| (*id, object)))
            .map(|(id, object)| ObjectSummary {
                object_type: id.object_type(),
                instance: id.instance(),
                name: match object.stored(PropertyId::ObjectName) {
                    Ok(PropertyValue::CharacterString(name)) => name.clone(),
                    _ => String::new(),
                },
                property_id: PropertyId::PresentValue,
                value: object.present_value().unwrap_or(PropertyValue::Null),
            })
            .collect();
        DeviceSummary {
            device_id: self.instance,
            name: self.name.clone(),
            device_type: self.device_type.clone(),
            address: self.address.ip(),
            port: self.address.port(),
            objects,
        }
    }
}

fn device_object(id: ObjectId, name: &str, device_type: &str, config: &FleetConfig) -> SimObject {
    let apdu_timeout = apdu_timeout_ms(config.apdu_timeout);
    let version = env!("CARGO_PKG_VERSION");
    let mut device = SimObject::new(ObjectType::Device);
    let read_only = [
        (PropertyId::ObjectIdentifier, PropertyValue::ObjectId(id)),
        (
            PropertyId::ObjectName,
            PropertyValue::CharacterString(name.to_string()),
        ),
        (
            PropertyId::ObjectType,
            PropertyValue::Enumerated(u32::from(ObjectType::Device.to_u16())),
        ),
        (PropertyId::SystemStatus, PropertyValue::Enumerated(0)),
        (
            PropertyId::VendorName,
            PropertyValue::CharacterString(config.vendor_name.clone()),
        ),
        (
            PropertyId::VendorIdentifier,
            PropertyValue::Unsigned(u32::from(config.vendor_id)),
        ),
        (
            PropertyId::ModelName,
            PropertyValue::CharacterString(config.model_name.clone()),
        ),
        (
            PropertyId::FirmwareRevision,
            PropertyValue::CharacterString(version.to_string()),
        ),
        (
            PropertyId::ApplicationSoftwareVersion,
            PropertyValue::CharacterString(version.to_string()),
        ),
        (
            PropertyId::ProtocolVersion,
            PropertyValue::Unsigned(PROTOCOL_VERSION),
        ),
        (
            PropertyId::ProtocolRevision,
            PropertyValue::Unsigned(PROTOCOL_REVISION),
        ),
        (
            PropertyId::MaxApduLengthAccepted,
            PropertyValue::Unsigned(MAX_APDU_LEN as u32),
        ),
        (
            PropertyId::SegmentationSupported,
            PropertyValue::Enumerated(Segmentation::NoSegmentation.to_u32()),
        ),
        (PropertyId::ApduTimeout, PropertyValue::Unsigned(apdu_timeout)),
        (PropertyId::NumberOfApduRetries, PropertyValue::Unsigned(0)),
    ];
    for (property, value) in read_only {
        device.set(property, value, Access::ReadOnly);
    }
    device.set(
        PropertyId::Description,
        PropertyValue::CharacterString(device_type.to_string()),
        Access::Writable,
    );
    device.set(
        PropertyId::Location,
        PropertyValue::CharacterString(String::new()),
        Access::Writable,
    );
    device
}

/// All devices of the fleet, keyed by instance number.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<u32, Arc<SimulatedDevice>>,
}

impl DeviceRegistry {
    pub fn new(devices: impl IntoIterator<Item = SimulatedDevice>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.instance, Arc::new(d)))
                .collect(),
        }
    }

    /// Builds every planned device at the address it was bound to.
    pub fn build(config: &FleetConfig, bound: &[(DevicePlan, SocketAddr)]) -> Self {
        Self::new(
            bound
                .iter()
                .map(|(plan, addr)| SimulatedDevice::from_plan(plan, config, *addr)),
        )
    }

    pub fn get(&self, device_id: u32) -> Result<Arc<SimulatedDevice>, RegistryError> {
        self.devices
            .get(&device_id)
            .cloned()
            .ok_or(RegistryError::DeviceNotFound(device_id))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Instance numbers in ascending order.
    pub fn device_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.devices.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn read_property(
        &self,
        device_id: u32,
        object_id: ObjectId,
        property: PropertyId,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, RegistryError> {
        self.get(device_id)?
            .read_property(object_id, property, array_index)
            .await
    }

    pub async fn write_property(
        &self,
        device_id: u32,
        object_id: ObjectId,
        property: PropertyId,
        array_index: Option<u32>,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), RegistryError> {
        self.get(device_id)?
            .write_property(object_id, property, array_index, value, priority)
            .await
    }

    /// Snapshot of every device, ordered by instance.
    pub async fn list_devices(&self) -> Vec<DeviceSummary> {
        let mut out = Vec::with_capacity(self.devices.len());
        for id in self.device_ids() {
            if let Some(device) = self.devices.get(&id) {
                out.push(device.summary().await);
            }
        }
        out
    }
}

fn apdu_timeout_ms(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{DeviceRegistry, SimulatedDevice};
    use crate::config::{DevicePlan, FleetConfig};
    use crate::error::RegistryError;
    use crate::value::PropertyValue;
    use bacsim_core::types::{ObjectId, ObjectType, PropertyId};
    use std::net::SocketAddr;

    fn device(instance: u32, device_type: &str) -> SimulatedDevice {
        let plan = DevicePlan {
            index: 0,
            instance,
            device_type: device_type.to_string(),
            bind: "127.0.0.1:47808".parse().unwrap(),
        };
        let addr: SocketAddr = "127.0.0.1:47808".parse().unwrap();
        SimulatedDevice::from_plan(&plan, &FleetConfig::default(), addr)
    }

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new([
            device(100, "controller"),
            device(101, "sensor"),
            device(102, "stimulator"),
        ])
    }

    fn ai(instance: u32) -> ObjectId {
        ObjectId::new(ObjectType::AnalogInput, instance)
    }

    #[tokio::test]
    async fn reads_template_values() {
        let reg = registry();
        let pv = reg
            .read_property(100, ai(2), PropertyId::PresentValue, None)
            .await
            .unwrap();
        assert_eq!(pv, PropertyValue::Real(22.0));

        let bo1 = reg
            .read_property(
                100,
                ObjectId::new(ObjectType::BinaryOutput, 1),
                PropertyId::PresentValue,
                None,
            )
            .await
            .unwrap();
        assert_eq!(bo1, PropertyValue::Enumerated(0));

        let name = reg
            .read_property(101, ai(1), PropertyId::ObjectName, None)
            .await
            .unwrap();
        assert_eq!(name, PropertyValue::CharacterString("HumiditySensor0".into()));
    }

    #[tokio::test]
    async fn unknown_lookups_are_typed() {
        let reg = registry();
        assert_eq!(
            reg.read_property(100, ai(99), PropertyId::PresentValue, None)
                .await,
            Err(RegistryError::UnknownObject(ai(99)))
        );
        assert_eq!(
            reg.read_property(100, ai(0), PropertyId::NumberOfStates, None)
                .await,
            Err(RegistryError::UnknownProperty(PropertyId::NumberOfStates))
        );
        assert!(matches!(
            reg.get(555),
            Err(RegistryError::DeviceNotFound(555))
        ));
    }

    #[tokio::test]
    async fn object_list_array_access() {
        let reg = registry();
        let dev = ObjectId::device(100);
        // device + 3 x (AI, AO, BI, BO)
        assert_eq!(
            reg.read_property(100, dev, PropertyId::ObjectList, Some(0))
                .await
                .unwrap(),
            PropertyValue::Unsigned(13)
        );
        assert_eq!(
            reg.read_property(100, dev, PropertyId::ObjectList, Some(1))
                .await
                .unwrap(),
            PropertyValue::ObjectId(dev)
        );
        assert_eq!(
            reg.read_property(100, dev, PropertyId::ObjectList, Some(14))
                .await,
            Err(RegistryError::InvalidArrayIndex)
        );
        assert_eq!(
            reg.read_property(100, dev, PropertyId::ObjectName, Some(1))
                .await,
            Err(RegistryError::PropertyIsNotAnArray)
        );
    }

    #[tokio::test]
    async fn wildcard_instance_names_the_device_itself() {
        let reg = registry();
        let wildcard = ObjectId::device(ObjectId::WILDCARD_INSTANCE);
        assert_eq!(
            reg.read_property(102, wildcard, PropertyId::ObjectIdentifier, None)
                .await
                .unwrap(),
            PropertyValue::ObjectId(ObjectId::device(102))
        );
    }

    #[tokio::test]
    async fn write_then_read_value_object() {
        let reg = registry();
        let av = ObjectId::new(ObjectType::AnalogValue, 0);
        reg.write_property(102, av, PropertyId::PresentValue, None, PropertyValue::Real(42.0), None)
            .await
            .unwrap();
        assert_eq!(
            reg.read_property(102, av, PropertyId::PresentValue, None)
                .await
                .unwrap(),
            PropertyValue::Real(42.0)
        );
    }

    #[tokio::test]
    async fn commandable_priority_array() {
        let reg = registry();
        let ao = ObjectId::new(ObjectType::AnalogOutput, 0);
        async fn pv(reg: &DeviceRegistry) -> PropertyValue {
            let ao = ObjectId::new(ObjectType::AnalogOutput, 0);
            reg.read_property(100, ao, PropertyId::PresentValue, None)
                .await
                .unwrap()
        }
        assert_eq!(pv(&reg).await, PropertyValue::Real(10.0));

        reg.write_property(100, ao, PropertyId::PresentValue, None, PropertyValue::Real(50.0), Some(8))
            .await
            .unwrap();
        reg.write_property(100, ao, PropertyId::PresentValue, None, PropertyValue::Real(70.0), None)
            .await
            .unwrap();
        assert_eq!(pv(&reg).await, PropertyValue::Real(50.0));

        let slot8 = reg
            .read_property(100, ao, PropertyId::PriorityArray, Some(8))
            .await
            .unwrap();
        assert_eq!(slot8, PropertyValue::Real(50.0));

        reg.write_property(100, ao, PropertyId::PresentValue, None, PropertyValue::Null, Some(8))
            .await
            .unwrap();
        assert_eq!(pv(&reg).await, PropertyValue::Real(70.0));

        reg.write_property(100, ao, PropertyId::PresentValue, None, PropertyValue::Null, Some(16))
            .await
            .unwrap();
        assert_eq!(pv(&reg).await, PropertyValue::Real(10.0));

        assert_eq!(
            reg.write_property(100, ao, PropertyId::PresentValue, None, PropertyValue::Real(1.0), Some(17))
                .await,
            Err(RegistryError::ValueOutOfRange)
        );
        assert_eq!(
            reg.write_property(100, ao, PropertyId::PriorityArray, None, PropertyValue::Null, None)
                .await,
            Err(RegistryError::WriteAccessDenied)
        );
    }

    #[tokio::test]
    async fn input_writable_only_out_of_service() {
        let reg = registry();
        assert_eq!(
            reg.write_property(100, ai(0), PropertyId::PresentValue, None, PropertyValue::Real(1.0), None)
                .await,
            Err(RegistryError::WriteAccessDenied)
        );
        reg.write_property(100, ai(0), PropertyId::OutOfService, None, PropertyValue::Boolean(true), None)
            .await
            .unwrap();
        reg.write_property(100, ai(0), PropertyId::PresentValue, None, PropertyValue::Real(1.0), None)
            .await
            .unwrap();
        assert_eq!(
            reg.read_property(100, ai(0), PropertyId::StatusFlags, None)
                .await
                .unwrap(),
            PropertyValue::BitString {
                unused_bits: 4,
                data: vec![0b0001_0000]
            }
        );
    }

    #[tokio::test]
    async fn datatype_and_range_checks() {
        let reg = registry();
        let bv = ObjectId::new(ObjectType::BinaryValue, 0);
        let msv = ObjectId::new(ObjectType::MultiStateValue, 0);
        assert_eq!(
            reg.write_property(102, bv, PropertyId::PresentValue, None, PropertyValue::Real(1.0), None)
                .await,
            Err(RegistryError::InvalidDataType)
        );
        assert_eq!(
            reg.write_property(102, bv, PropertyId::PresentValue, None, PropertyValue::Enumerated(2), None)
                .await,
            Err(RegistryError::ValueOutOfRange)
        );
        assert_eq!(
            reg.write_property(102, msv, PropertyId::PresentValue, None, PropertyValue::Unsigned(4), None)
                .await,
            Err(RegistryError::ValueOutOfRange)
        );
        reg.write_property(102, msv, PropertyId::PresentValue, None, PropertyValue::Unsigned(1), None)
            .await
            .unwrap();
        assert_eq!(
            reg.write_property(
                102,
                ObjectId::device(102),
                PropertyId::Location,
                None,
                PropertyValue::Unsigned(1),
                None
            )
            .await,
            Err(RegistryError::InvalidDataType)
        );
        assert_eq!(
            reg.write_property(
                102,
                ObjectId::device(102),
                PropertyId::VendorName,
                None,
                PropertyValue::CharacterString("x".into()),
                None
            )
            .await,
            Err(RegistryError::WriteAccessDenied)
        );
    }

    #[tokio::test]
    async fn snapshot_lists_devices_in_order() {
        let reg = registry();
        let list = reg.list_devices().await;
        let ids: Vec<u32> = list.iter().map(|d| d.device_id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
        assert_eq!(list[1].device_type, "sensor");
        assert_eq!(list[1].objects.len(), 6);
        assert_eq!(list[1].objects[0].name, "TempSensor0");
        assert_eq!(list[1].objects[0].value, PropertyValue::Real(22.5));
        assert_eq!(list[0].name, "BACnetStimDevice100");
    }
}
