use hiccup_core::{Member, ObjectRef, Record, RegisteredMembers};

/// `{name: "a", tags: ["x", "y"], meta: null}` with handles on every part
#[allow(dead_code)]
pub struct Sample {
    pub root: ObjectRef,
    pub name: ObjectRef,
    pub tags: ObjectRef,
    pub x: ObjectRef,
    pub y: ObjectRef,
    pub meta: ObjectRef,
}

#[allow(dead_code)]
pub fn sample() -> Sample {
    let name = ObjectRef::from("a");
    let x = ObjectRef::from("x");
    let y = ObjectRef::from("y");
    let tags = ObjectRef::from(vec![x.clone(), y.clone()]);
    let meta = ObjectRef::none();
    let root = ObjectRef::from(
        Record::new("Record")
            .field("name", name.clone())
            .field("tags", tags.clone())
            .field("meta", meta.clone()),
    );
    Sample {
        root,
        name,
        tags,
        x,
        y,
        meta,
    }
}

/// Plain Rust type exposed through a registered member function
#[allow(dead_code)]
pub struct Account {
    pub owner: ObjectRef,
    pub balance: ObjectRef,
    pub secret: ObjectRef,
}

#[allow(dead_code)]
pub fn account() -> Account {
    Account {
        owner: ObjectRef::from("ada"),
        balance: ObjectRef::from(10i64),
        secret: ObjectRef::from("hunter2"),
    }
}

#[allow(dead_code)]
pub fn account_members() -> RegisteredMembers {
    RegisteredMembers::new().with::<Account, _>(|a| {
        vec![
            ("owner".to_string(), Member::Value(a.owner.clone())),
            ("balance".to_string(), Member::Value(a.balance.clone())),
            ("secret".to_string(), Member::Value(a.secret.clone())),
        ]
    })
}

/// String content of a matched object, for readable assertions
#[allow(dead_code)]
pub fn text_of(obj: &ObjectRef) -> String {
    obj.downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| format!("<{}>", obj.display_type_name()))
}
