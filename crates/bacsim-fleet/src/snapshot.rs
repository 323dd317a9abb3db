use crate::value::PropertyValue;
use bacsim_core::types::{ObjectType, PropertyId};
use std::net::IpAddr;

/// Read-only view of one device, as served to dashboards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceSummary {
    pub device_id: u32,
    pub name: String,
    pub device_type: String,
    pub address: IpAddr,
    pub port: u16,
    pub objects: Vec<ObjectSummary>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectSummary {
    pub object_type: ObjectType,
    pub instance: u32,
    pub name: String,
    pub property_id: PropertyId,
    pub value: PropertyValue,
}
