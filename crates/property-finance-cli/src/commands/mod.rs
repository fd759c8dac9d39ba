pub mod affordability;
pub mod cpf;
pub mod debt_servicing;
pub mod mortgage;
pub mod ownership;
pub mod schedule;
pub mod stamp_duty;

use clap::ValueEnum;
use property_finance_core::{PropertyType, Residency};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResidencyArg {
    Citizen,
    Pr,
    Foreigner,
}

impl From<ResidencyArg> for Residency {
    fn from(arg: ResidencyArg) -> Self {
        match arg {
            ResidencyArg::Citizen => Residency::Citizen,
            ResidencyArg::Pr => Residency::PermanentResident,
            ResidencyArg::Foreigner => Residency::Foreigner,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PropertyTypeArg {
    Hdb,
    Ec,
    Condo,
    Landed,
}

impl From<PropertyTypeArg> for PropertyType {
    fn from(arg: PropertyTypeArg) -> Self {
        match arg {
            PropertyTypeArg::Hdb => PropertyType::Hdb,
            PropertyTypeArg::Ec => PropertyType::Ec,
            PropertyTypeArg::Condo => PropertyType::Condo,
            PropertyTypeArg::Landed => PropertyType::Landed,
        }
    }
}
