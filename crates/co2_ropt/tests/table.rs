use std::fs;

use co2_ropt::error::Result;
use co2_ropt::{Dummy, RolePart, RolePartTable};
use tempfile::TempDir;
use tracing_test::traced_test;

fn sample() -> Result<RolePartTable> {
    let mut table = RolePartTable::new();
    table.insert_part(RolePart::new("Armet", "ini/armet.ini", "ini/armetmotion.ini")?);
    table.insert_part(RolePart::new("Armor", "ini/armor.ini", "ini/armormotion.ini")?);
    table.insert_part(RolePart::new("Weapon", "ini/weapon.ini", "ini/weaponmotion.ini")?);
    table.insert_dummy(Dummy::new(0, "Head")?);
    table.insert_dummy(Dummy::new(1, "LeftHand")?);
    Ok(table)
}

#[traced_test]
#[test]
fn save_then_open_is_equal() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("RolePart.ropt");

    let table = sample()?;
    table.save(&path)?;

    assert_eq!(fs::metadata(&path)?.len(), 12 + 3 * 544 + 2 * 36);

    let loaded = RolePartTable::open(&path)?;
    assert_eq!(loaded, table);
    assert_eq!(
        loaded.part("Armor").map(|p| p.mesh_ini.to_string()),
        Some("ini/armor.ini".to_string())
    );
    assert_eq!(loaded.dummy(1).map(|d| d.name.to_string()), Some("LeftHand".to_string()));
    assert!(loaded.part("armor").is_none());

    Ok(())
}

#[test]
fn records_serialize_as_strings() -> Result<()> {
    let part = RolePart::new("Armor", "ini/armor.ini", "")?;
    let json = serde_json::to_string(&part).unwrap();
    assert_eq!(
        json,
        r#"{"name":"Armor","mesh_ini":"ini/armor.ini","motion_ini":""}"#
    );
    assert_eq!(serde_json::from_str::<RolePart>(&json).unwrap(), part);

    let too_long = format!(r#"{{"id":1,"name":"{}"}}"#, "x".repeat(40));
    assert!(serde_json::from_str::<Dummy>(&too_long).is_err());

    Ok(())
}
