use serde::{Deserialize, Serialize};

/// Driver type configured for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    #[default]
    None,
    Dht11,
    Dht22,
    Bme280,
    Bmp280,
    Sht31,
    Ds18b20,
    Lm35,
    Tmp36,
    SoilMoisture,
    Pir,
    Relay,
    Ccs811,
    Scd40,
    Bh1750,
    Tsl2561,
    Vl53l0x,
}

impl SensorKind {
    pub const ALL: [SensorKind; 17] = [
        SensorKind::None,
        SensorKind::Dht11,
        SensorKind::Dht22,
        SensorKind::Bme280,
        SensorKind::Bmp280,
        SensorKind::Sht31,
        SensorKind::Ds18b20,
        SensorKind::Lm35,
        SensorKind::Tmp36,
        SensorKind::SoilMoisture,
        SensorKind::Pir,
        SensorKind::Relay,
        SensorKind::Ccs811,
        SensorKind::Scd40,
        SensorKind::Bh1750,
        SensorKind::Tsl2561,
        SensorKind::Vl53l0x,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SensorKind::None => "NONE",
            SensorKind::Dht11 => "DHT11",
            SensorKind::Dht22 => "DHT22",
            SensorKind::Bme280 => "BME280",
            SensorKind::Bmp280 => "BMP280",
            SensorKind::Sht31 => "SHT31",
            SensorKind::Ds18b20 => "DS18B20",
            SensorKind::Lm35 => "LM35",
            SensorKind::Tmp36 => "TMP36",
            SensorKind::SoilMoisture => "SOIL_MOISTURE",
            SensorKind::Pir => "PIR",
            SensorKind::Relay => "RELAY",
            SensorKind::Ccs811 => "CCS811",
            SensorKind::Scd40 => "SCD40",
            SensorKind::Bh1750 => "BH1750",
            SensorKind::Tsl2561 => "TSL2561",
            SensorKind::Vl53l0x => "VL53L0X",
        }
    }

    pub fn is_none(self) -> bool {
        self == SensorKind::None
    }

    /// Whether the device sits on the shared I2C bus (and so behind the multiplexer).
    pub fn is_i2c(self) -> bool {
        self.default_address().is_some()
    }

    pub fn default_address(self) -> Option<u8> {
        match self {
            SensorKind::Bme280 | SensorKind::Bmp280 => Some(0x76),
            SensorKind::Sht31 => Some(0x44),
            SensorKind::Ccs811 => Some(0x5A),
            SensorKind::Scd40 => Some(0x62),
            SensorKind::Bh1750 => Some(0x23),
            SensorKind::Tsl2561 => Some(0x39),
            SensorKind::Vl53l0x => Some(0x29),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i2c_kinds_have_addresses() {
        let i2c: alloc::vec::Vec<_> = SensorKind::ALL.iter().filter(|k| k.is_i2c()).collect();

        assert_eq!(i2c.len(), 8);
        assert!(!SensorKind::Dht22.is_i2c());
        assert!(!SensorKind::Ds18b20.is_i2c());
        assert_eq!(SensorKind::Bme280.default_address(), Some(0x76));
    }

    #[test]
    fn test_labels_are_unique() {
        for (i, a) in SensorKind::ALL.iter().enumerate() {
            for b in &SensorKind::ALL[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }
}
