// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    create_test_equipment, create_test_warehouse, stock_supplies, units_in,
};
use crate::{InMemoryBackend, InventoryStockCheck, StockRepository};
use fieldops::{StockCheck, StoreError};
use fieldops_domain::{
    EquipmentRequirement, EquipmentStock, OrderType, StockRequirement, Warehouse,
};

fn model(name: &str) -> EquipmentRequirement {
    EquipmentRequirement {
        model_name: Some(String::from(name)),
        min_btu: None,
    }
}

fn create_stocked_backend() -> (InMemoryBackend, Warehouse) {
    let backend: InMemoryBackend = InMemoryBackend::new();
    let warehouse: Warehouse = create_test_warehouse("Central");
    backend.warehouses.upsert(warehouse.clone());
    backend
        .equipment
        .add(create_test_equipment(warehouse.id, "Daikin FTXM35", 12_000))
        .unwrap();
    stock_supplies(&backend, warehouse.id, OrderType::Installation);
    (backend, warehouse)
}

#[tokio::test]
async fn test_equipment_matches_model_case_insensitively() {
    let (backend, warehouse) = create_stocked_backend();
    let check: InventoryStockCheck = backend.stock_check();

    assert!(check
        .has_equipment(warehouse.id, &model("daikin ftxm35"))
        .await
        .unwrap());
    assert!(!check
        .has_equipment(warehouse.id, &model("Gree Bora"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_equipment_matches_by_capacity_without_model() {
    let (backend, warehouse) = create_stocked_backend();
    let check: InventoryStockCheck = backend.stock_check();
    let by_btu = |min_btu: u32| EquipmentRequirement {
        model_name: None,
        min_btu: Some(min_btu),
    };

    assert!(check.has_equipment(warehouse.id, &by_btu(9_000)).await.unwrap());
    assert!(!check.has_equipment(warehouse.id, &by_btu(18_000)).await.unwrap());
}

#[tokio::test]
async fn test_supplies_depend_on_order_type() {
    let (backend, warehouse) = create_stocked_backend();
    let check: InventoryStockCheck = backend.stock_check();

    assert!(check
        .has_supplies(warehouse.id, OrderType::Installation)
        .await
        .unwrap());
    assert!(!check
        .has_supplies(warehouse.id, OrderType::Maintenance)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_reserve_takes_one_of_everything() {
    let (backend, warehouse) = create_stocked_backend();
    let check: InventoryStockCheck = backend.stock_check();
    let requirement: StockRequirement =
        StockRequirement::new(OrderType::Installation, Some(model("Daikin FTXM35")));
    let before: u32 = units_in(&backend, warehouse.id);

    check
        .reserve(warehouse.id, warehouse.id, &requirement)
        .await
        .unwrap();

    // one unit, three materials, three tools
    assert_eq!(units_in(&backend, warehouse.id), before - 7);
    assert!(!check.has_all(warehouse.id, &requirement).await.unwrap());
}

#[tokio::test]
async fn test_failed_reserve_takes_nothing() {
    let (backend, warehouse) = create_stocked_backend();
    let check: InventoryStockCheck = backend.stock_check();
    let requirement: StockRequirement =
        StockRequirement::new(OrderType::Installation, Some(model("Gree Bora")));
    let before: u32 = units_in(&backend, warehouse.id);

    let result = check.reserve(warehouse.id, warehouse.id, &requirement).await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert_eq!(units_in(&backend, warehouse.id), before);
}

#[tokio::test]
async fn test_partial_supplies_are_returned_on_failure() {
    let (backend, warehouse) = create_stocked_backend();
    let check: InventoryStockCheck = backend.stock_check();
    let requirement: StockRequirement =
        StockRequirement::new(OrderType::Installation, Some(model("Daikin FTXM35")));
    let hammer = backend
        .tools
        .by_warehouse(warehouse.id)
        .into_iter()
        .find(|t| t.tool_name == "Rotary hammer")
        .unwrap();
    backend.tools.delete(hammer.id).unwrap();
    let before: u32 = units_in(&backend, warehouse.id);

    assert!(
        check
            .reserve(warehouse.id, warehouse.id, &requirement)
            .await
            .is_err()
    );
    assert_eq!(units_in(&backend, warehouse.id), before);
}

#[tokio::test]
async fn test_equipment_can_come_from_another_warehouse() {
    let backend: InMemoryBackend = InMemoryBackend::new();
    let supplies: Warehouse = create_test_warehouse("Supplies");
    let equipment: Warehouse = create_test_warehouse("Equipment");
    stock_supplies(&backend, supplies.id, OrderType::Installation);
    let unit: EquipmentStock = create_test_equipment(equipment.id, "Daikin FTXM35", 12_000);
    backend.equipment.add(unit.clone()).unwrap();
    let check: InventoryStockCheck = backend.stock_check();
    let requirement: StockRequirement =
        StockRequirement::new(OrderType::Installation, Some(model("Daikin FTXM35")));

    check
        .reserve(supplies.id, equipment.id, &requirement)
        .await
        .unwrap();
    assert_eq!(backend.equipment.get(unit.id).unwrap().quantity, 0);

    check
        .restore(supplies.id, equipment.id, &requirement)
        .await
        .unwrap();
    assert_eq!(backend.equipment.get(unit.id).unwrap().quantity, 1);
    assert!(check.has_supplies(supplies.id, OrderType::Installation).await.unwrap());
}
