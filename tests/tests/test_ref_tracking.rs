// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Shared and cyclic object graphs under reference tracking.

use fory_wire::types::{STRING, VARINT32};
use fory_wire::{Error, FieldInfo, FieldType, Fory, TypeKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn node_fory(track_ref: bool) -> Fory {
    let mut fory = Fory::default().track_ref(track_ref);
    fory.register_struct(
        60,
        "Node",
        vec![
            FieldInfo::new("id", FieldType::new(VARINT32, false)),
            FieldInfo::new("next", FieldType::struct_of(60, true)),
        ],
    )
    .unwrap();
    fory
}

#[test]
fn self_referencing_node_keeps_its_identity() {
    let fory = node_fory(true);
    let node = Rc::new(RefCell::new(Value::Struct {
        key: TypeKey::Id(60),
        fields: vec![Value::VarInt32(1), Value::Null],
    }));
    if let Value::Struct { fields, .. } = &mut *node.borrow_mut() {
        fields[1] = Value::Ref(node.clone());
    }

    let bytes = fory.serialize(&Value::Ref(node)).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();

    let Value::Ref(out) = decoded else {
        panic!("expected a tracked value");
    };
    let inner = out.borrow();
    let Value::Struct { fields, .. } = &*inner else {
        panic!("expected a node struct");
    };
    assert_eq!(fields[0], Value::VarInt32(1));
    let Value::Ref(next) = &fields[1] else {
        panic!("expected a back-reference");
    };
    // the cycle closes onto the same instance, not a copy
    assert!(Rc::ptr_eq(&out, next));
}

#[test]
fn two_node_cycle_round_trips() {
    let fory = node_fory(true);
    let a = Rc::new(RefCell::new(Value::Struct {
        key: TypeKey::Id(60),
        fields: vec![Value::VarInt32(1), Value::Null],
    }));
    let b = Rc::new(RefCell::new(Value::Struct {
        key: TypeKey::Id(60),
        fields: vec![Value::VarInt32(2), Value::Ref(a.clone())],
    }));
    if let Value::Struct { fields, .. } = &mut *a.borrow_mut() {
        fields[1] = Value::Ref(b.clone());
    }

    let bytes = fory.serialize(&Value::Ref(a)).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();
    let Value::Ref(out_a) = decoded else {
        panic!("expected a tracked value");
    };
    let borrowed_a = out_a.borrow();
    let Value::Struct { fields, .. } = &*borrowed_a else {
        panic!("expected a node struct");
    };
    assert_eq!(fields[0], Value::VarInt32(1));
    let Value::Ref(out_b) = &fields[1] else {
        panic!("expected a nested node");
    };
    let borrowed_b = out_b.borrow();
    let Value::Struct { fields: b_fields, .. } = &*borrowed_b else {
        panic!("expected a node struct");
    };
    assert_eq!(b_fields[0], Value::VarInt32(2));
    let Value::Ref(back) = &b_fields[1] else {
        panic!("expected a back-reference");
    };
    assert!(Rc::ptr_eq(&out_a, back));
}

#[test]
fn shared_value_serializes_once_and_resolves_to_one_instance() {
    let fory = Fory::default();
    let shared = Value::shared(Value::String("shared payload".to_string()));
    let list = Value::List(vec![shared.clone(), shared.clone(), shared]);

    let bytes = fory.serialize(&list).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();
    assert_eq!(decoded, list);

    let Value::List(items) = decoded else {
        panic!("expected a list");
    };
    let (Value::Ref(first), Value::Ref(second), Value::Ref(third)) =
        (&items[0], &items[1], &items[2])
    else {
        panic!("expected tracked elements, got {items:?}");
    };
    assert!(Rc::ptr_eq(first, second));
    assert!(Rc::ptr_eq(first, third));
}

#[test]
fn tracking_disabled_turns_shared_values_into_copies() {
    let fory = Fory::default().track_ref(false);
    let shared = Value::shared(Value::String("copied".to_string()));
    let list = Value::List(vec![shared.clone(), shared]);

    let bytes = fory.serialize(&list).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();
    let Value::List(items) = decoded else {
        panic!("expected a list");
    };
    // equal contents, independent instances
    assert_eq!(items[0], Value::String("copied".to_string()));
    assert_eq!(items[1], Value::String("copied".to_string()));
    assert!(!items[0].is_ref());
    assert!(!items[1].is_ref());
}

#[test]
fn shared_struct_field_between_two_parents() {
    let mut fory = Fory::default();
    fory.register_struct(
        61,
        "Holder",
        vec![
            FieldInfo::new("label", FieldType::new(STRING, false)),
            FieldInfo::new("node", FieldType::struct_of(60, true)),
        ],
    )
    .unwrap();
    fory.register_struct(
        60,
        "Node",
        vec![
            FieldInfo::new("id", FieldType::new(VARINT32, false)),
            FieldInfo::new("next", FieldType::struct_of(60, true)),
        ],
    )
    .unwrap();

    let shared_node = Value::shared(Value::Struct {
        key: TypeKey::Id(60),
        fields: vec![Value::VarInt32(9), Value::Null],
    });
    let holder = |label: &str| Value::Struct {
        key: TypeKey::Id(61),
        fields: vec![Value::String(label.to_string()), shared_node.clone()],
    };
    let list = Value::List(vec![holder("a"), holder("b")]);
    let bytes = fory.serialize(&list).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();
    assert_eq!(decoded, list);

    let Value::List(items) = decoded else {
        panic!("expected a list");
    };
    // the holders themselves are plain values (the homogeneous list path
    // writes raw payloads), only the shared node is tracked
    let get_node = |item: &Value| -> Rc<RefCell<Value>> {
        let Value::Struct { fields, .. } = item else {
            panic!("expected a holder struct, got {item:?}");
        };
        let Value::Ref(node_rc) = &fields[1] else {
            panic!("expected a tracked node");
        };
        node_rc.clone()
    };
    assert!(Rc::ptr_eq(&get_node(&items[0]), &get_node(&items[1])));
}

#[test]
fn tracked_fields_share_one_instance_in_schema_consistent_mode() {
    let mut fory = Fory::default();
    fory.register_struct(
        62,
        "TwinHolder",
        vec![
            FieldInfo::new("first", FieldType::new(STRING, false).tracking()),
            FieldInfo::new("second", FieldType::new(STRING, false).tracking()),
        ],
    )
    .unwrap();
    let shared = Value::shared(Value::String("once".to_string()));
    let holder = Value::Struct {
        key: TypeKey::Id(62),
        fields: vec![shared.clone(), shared],
    };
    let bytes = fory.serialize(&holder).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();
    assert_eq!(decoded, holder);

    let Value::Ref(rc) = decoded else {
        panic!("expected a tracked struct");
    };
    let borrowed = rc.borrow();
    let Value::Struct { fields, .. } = &*borrowed else {
        panic!("expected a struct");
    };
    let (Value::Ref(first), Value::Ref(second)) = (&fields[0], &fields[1]) else {
        panic!("expected tracked fields, got {fields:?}");
    };
    assert!(Rc::ptr_eq(first, second));
}

#[test]
fn dangling_back_reference_is_rejected() {
    let fory = Fory::default();
    // Ref flag (-2) followed by id 5, which was never assigned
    let bytes = [0xfeu8, 5];
    assert!(matches!(
        fory.deserialize(&bytes),
        Err(Error::DanglingReference(_))
    ));
}
