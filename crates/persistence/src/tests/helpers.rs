// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{InMemoryBackend, StockRepository};
use fieldops_domain::{
    Coordinate, EquipmentStock, MaterialStock, Order, OrderId, OrderType, StockItemId,
    Technician, TechnicianId, ToolStock, Warehouse, WarehouseId, required_materials,
    required_tools,
};
use time::OffsetDateTime;

pub fn create_test_coordinate() -> Coordinate {
    Coordinate::new(47.0105, 28.8638).unwrap()
}

pub fn create_test_order() -> Order {
    Order::new(
        OrderId::new(),
        OrderType::Installation,
        create_test_coordinate(),
        None,
        OffsetDateTime::UNIX_EPOCH,
    )
}

pub fn create_test_technician(name: &str) -> Technician {
    Technician::new(
        TechnicianId::new(),
        String::from(name),
        String::from("+37360000000"),
        Coordinate::new(47.02, 28.87).unwrap(),
    )
}

pub fn create_test_warehouse(name: &str) -> Warehouse {
    Warehouse::new(
        WarehouseId::new(),
        String::from(name),
        Coordinate::new(47.03, 28.83).unwrap(),
    )
}

pub fn create_test_equipment(warehouse_id: WarehouseId, model: &str, btu: u32) -> EquipmentStock {
    EquipmentStock {
        id: StockItemId::new(),
        warehouse_id,
        model_name: String::from(model),
        btu,
        quantity: 1,
    }
}

/// Stocks `warehouse` with one unit of every supply `order_type` needs.
pub fn stock_supplies(backend: &InMemoryBackend, warehouse_id: WarehouseId, order_type: OrderType) {
    for name in required_materials(order_type) {
        backend
            .materials
            .add(MaterialStock {
                id: StockItemId::new(),
                warehouse_id,
                material_name: (*name).to_string(),
                quantity: 1,
            })
            .unwrap();
    }
    for name in required_tools(order_type) {
        backend
            .tools
            .add(ToolStock {
                id: StockItemId::new(),
                warehouse_id,
                tool_name: (*name).to_string(),
                quantity: 1,
            })
            .unwrap();
    }
}

/// Total units of every kind held by a warehouse.
pub fn units_in(backend: &InMemoryBackend, warehouse_id: WarehouseId) -> u32 {
    backend
        .equipment
        .by_warehouse(warehouse_id)
        .iter()
        .map(|i| i.quantity)
        .chain(
            backend
                .materials
                .by_warehouse(warehouse_id)
                .iter()
                .map(|i| i.quantity),
        )
        .chain(
            backend
                .tools
                .by_warehouse(warehouse_id)
                .iter()
                .map(|i| i.quantity),
        )
        .sum()
}
