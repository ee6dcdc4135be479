use serde::Serialize;

/// Display metadata for a measured quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
}

/// Parameters the reference data set carries, in display order.
pub static PARAMETERS: [Parameter; 5] = [
    Parameter { id: "temperature", label: "Temperature", unit: "°C" },
    Parameter { id: "salinity", label: "Salinity", unit: "PSU" },
    Parameter { id: "oxygen", label: "Dissolved Oxygen", unit: "μmol/kg" },
    Parameter { id: "pressure", label: "Pressure", unit: "dbar" },
    Parameter { id: "conductivity", label: "Conductivity", unit: "S/m" },
];

/// Look up metadata. Unknown names are still usable for composition.
pub fn parameter(id: &str) -> Option<&'static Parameter> {
    PARAMETERS.iter().find(|p| p.id == id)
}

impl Parameter {
    /// `"Temperature (°C)"`
    pub fn axis_label(&self) -> String {
        format!("{} ({})", self.label, self.unit)
    }
}
