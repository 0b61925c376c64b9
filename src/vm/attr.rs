//! 속성 접근 프로토콜
//!
//! 클래스가 attr_get / attr_set 훅을 해석하면 그 훅을 사용하고, 아니면 기본 경로를 탑니다.
//! 기본 경로는 클래스 자신의 속성 사전만 조회합니다.
//!
//! - 메서드 엔트리: get → 수신 객체를 retain하는 Method 객체. set → read-only
//! - 멤버 엔트리: 타입 지정 필드를 읽어 Value로 박싱하거나, 타입 검사 후 기록

use std::rc::Rc;

use super::builtins::CLASS_STR;
use super::builtins::exception::{
    attr_exc_mismatch, attr_exc_not_found, attr_exc_readonly, attr_exc_unset,
};
use super::error::Error;
use super::registry::ClassRegistry;
use super::type_def::{AttrEntry, Member, MemberFlags, MemberKind};
use super::utils::{make_method, make_string};
use super::value::{Field, Value};

pub fn get_attr(reg: &ClassRegistry, v: &Value, attr: &str) -> Value {
    let Some(class) = v.class_id() else {
        return Value::from_error(Error::internal("attribute access on a sentinel"));
    };
    match reg.resolve_attr_get(class) {
        Some(hook) => hook(reg, v, attr),
        None => get_attr_default(reg, v, attr),
    }
}

pub fn set_attr(reg: &ClassRegistry, v: &Value, attr: &str, new: &Value) -> Value {
    let Some(class) = v.class_id() else {
        return Value::from_error(Error::internal("attribute access on a sentinel"));
    };
    match reg.resolve_attr_set(class) {
        Some(hook) => hook(reg, v, attr, new),
        None => set_attr_default(reg, v, attr, new),
    }
}

pub fn get_attr_default(reg: &ClassRegistry, v: &Value, attr: &str) -> Value {
    let class_name = reg.class_name_of(v);
    let (Value::Object(obj), Some(class)) = (v, v.class_id().and_then(|c| reg.get(c))) else {
        return attr_exc_not_found(class_name, attr);
    };

    let member = match class.attr(attr) {
        None => return attr_exc_not_found(class_name, attr),
        Some(AttrEntry::Method(idx)) => {
            let method = &class.methods[idx];
            return make_method(obj.clone(), method.name.as_str(), method.func);
        }
        Some(AttrEntry::Member(idx)) => &class.members[idx],
    };

    let Some(fields) = obj.fields() else {
        return Value::from_error(Error::internal("member access on object without fields"));
    };
    let fields = fields.borrow();
    let Some(field) = fields.get(member.index) else {
        return Value::from_error(Error::internal("member index out of range"));
    };

    match field {
        Field::Char(c) => make_string(char::from(*c).to_string()),
        Field::Byte(n) => Value::Int(*n as i64),
        Field::Short(n) => Value::Int(*n as i64),
        Field::Int(n) => Value::Int(*n as i64),
        Field::Long(n) => Value::Int(*n),
        Field::UByte(n) => Value::Int(*n as i64),
        Field::UShort(n) => Value::Int(*n as i64),
        Field::UInt(n) => Value::Int(*n as i64),
        Field::ULong(n) => Value::Int(*n as i64),
        Field::Size(n) => Value::Int(*n as i64),
        Field::Bool(b) => Value::bool(*b),
        Field::Float(f) => Value::Float(*f as f64),
        Field::Double(d) => Value::Float(*d),
        Field::Str(Some(s)) => make_string(s.clone()),
        Field::Object(Some(o)) => Value::Object(o.clone()),
        Field::Str(None) | Field::Object(None) => attr_exc_unset(class_name, attr),
    }
}

/// 성공하면 `Int(0)`
pub fn set_attr_default(reg: &ClassRegistry, v: &Value, attr: &str, new: &Value) -> Value {
    let class_name = reg.class_name_of(v);
    let (Value::Object(obj), Some(class)) = (v, v.class_id().and_then(|c| reg.get(c))) else {
        return attr_exc_not_found(class_name, attr);
    };

    let member = match class.attr(attr) {
        None => return attr_exc_not_found(class_name, attr),
        Some(AttrEntry::Method(_)) => return attr_exc_readonly(class_name, attr),
        Some(AttrEntry::Member(idx)) => &class.members[idx],
    };
    if member.flags.contains(MemberFlags::READONLY) {
        return attr_exc_readonly(class_name, attr);
    }

    let Some(fields) = obj.fields() else {
        return Value::from_error(Error::internal("member access on object without fields"));
    };
    let mut fields = fields.borrow_mut();
    let Some(slot) = fields.get_mut(member.index) else {
        return Value::from_error(Error::internal("member index out of range"));
    };

    match convert(member, slot, new) {
        Some(field) => {
            // 이전 객체/문자열 참조는 여기서 release
            *slot = field;
            Value::Int(0)
        }
        None => attr_exc_mismatch(class_name, attr, reg.class_name_of(new)),
    }
}

/// 새 값을 멤버 종류에 맞는 필드로 변환. 타입이 맞지 않으면 `None`
fn convert(member: &Member, current: &Field, new: &Value) -> Option<Field> {
    let int = match new {
        Value::Int(n) => Some(*n),
        _ => None,
    };

    let field = match member.kind {
        MemberKind::Char => {
            let s = new.as_str().filter(|_| new.class_id() == Some(CLASS_STR))?;
            match s.as_bytes() {
                [c] => Field::Char(*c),
                _ => return None,
            }
        }
        MemberKind::Byte => Field::Byte(int? as i8),
        MemberKind::Short => Field::Short(int? as i16),
        MemberKind::Int => Field::Int(int? as i32),
        MemberKind::Long => Field::Long(int?),
        MemberKind::UByte => Field::UByte(int? as u8),
        MemberKind::UShort => Field::UShort(int? as u16),
        MemberKind::UInt => Field::UInt(int? as u32),
        MemberKind::ULong => Field::ULong(int? as u64),
        MemberKind::Size => Field::Size(int? as usize),
        MemberKind::Bool => Field::Bool(int? != 0),
        // Int는 승격
        MemberKind::Float => match new {
            Value::Int(n) => Field::Float(*n as f32),
            Value::Float(f) => Field::Float(*f as f32),
            _ => return None,
        },
        MemberKind::Double => match new {
            Value::Int(n) => Field::Double(*n as f64),
            Value::Float(f) => Field::Double(*f),
            _ => return None,
        },
        MemberKind::Str => {
            if new.class_id() != Some(CLASS_STR) {
                return None;
            }
            Field::Str(new.as_str().map(Rc::from))
        }
        MemberKind::Object => {
            let obj = new.as_object()?;
            if member.flags.contains(MemberFlags::TYPE_STRICT)
                && let Field::Object(Some(old)) = current
                && old.class != obj.class
            {
                return None;
            }
            Field::Object(Some(obj.clone()))
        }
    };
    Some(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::builtins::{CLASS_ATTR_EXC, CLASS_METHOD, CLASS_OBJECT};
    use crate::vm::ops;
    use crate::vm::type_def::{Class, ClassId, Layout};

    fn point_init(_: &ClassRegistry, this: &Value, _: &[Value]) -> Value {
        this.clone()
    }

    fn point_norm(_: &ClassRegistry, this: &Value, _: &[Value]) -> Value {
        let fields = this.as_object().and_then(|o| o.fields()).unwrap();
        let fields = fields.borrow();
        match (&fields[0], &fields[1]) {
            (Field::Int(x), Field::Double(y)) => Value::Float((*x as f64).hypot(*y)),
            _ => Value::Unsupported,
        }
    }

    fn setup() -> (ClassRegistry, ClassId) {
        let mut reg = ClassRegistry::new();
        let point = reg
            .register(
                Class::new("Point")
                    .with_layout(Layout::Fields)
                    .with_init(point_init)
                    .with_members(vec![
                        Member::new("x", MemberKind::Int, 0),
                        Member::new("y", MemberKind::Double, 1),
                        Member::new("id", MemberKind::Long, 2).with_flags(MemberFlags::READONLY),
                        Member::new("label", MemberKind::Str, 3),
                        Member::new("tag", MemberKind::Char, 4),
                        Member::new("flag", MemberKind::Bool, 5),
                        Member::new("owner", MemberKind::Object, 6)
                            .with_flags(MemberFlags::TYPE_STRICT),
                        Member::new("small", MemberKind::UByte, 7),
                    ])
                    .with_method("norm", point_norm),
            )
            .unwrap();
        (reg, point)
    }

    fn message(v: &Value) -> String {
        ops::exception_message(v).map(|m| m.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);

        assert_eq!(get_attr(&reg, &p, "x"), Value::Int(0));
        assert_eq!(set_attr(&reg, &p, "x", &Value::Int(3)), Value::Int(0));
        assert_eq!(set_attr(&reg, &p, "y", &Value::Int(4)), Value::Int(0));
        assert_eq!(get_attr(&reg, &p, "x"), Value::Int(3));
        assert_eq!(get_attr(&reg, &p, "y"), Value::Float(4.0));

        set_attr(&reg, &p, "flag", &Value::Int(7));
        assert_eq!(get_attr(&reg, &p, "flag"), Value::Int(1));

        set_attr(&reg, &p, "small", &Value::Int(300));
        assert_eq!(get_attr(&reg, &p, "small"), Value::Int(44));
    }

    #[test]
    fn test_method_entry_binds_receiver() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);
        set_attr(&reg, &p, "x", &Value::Int(3));
        set_attr(&reg, &p, "y", &Value::Float(4.0));

        let receiver = p.as_object().unwrap().clone();
        let before = Rc::strong_count(&receiver);
        let m = get_attr(&reg, &p, "norm");
        assert_eq!(m.class_id(), Some(CLASS_METHOD));
        assert_eq!(Rc::strong_count(&receiver), before + 1);

        assert_eq!(ops::call(&reg, &m, &[]), Value::Float(5.0));
        drop(m);
        assert_eq!(Rc::strong_count(&receiver), before);
    }

    #[test]
    fn test_missing_attribute() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);
        let r = get_attr(&reg, &p, "z");
        assert_eq!(r.class_id(), Some(CLASS_ATTR_EXC));
        assert_eq!(message(&r), "object of type 'Point' has no attribute 'z'");

        let r = get_attr(&reg, &Value::Int(1), "x");
        assert_eq!(message(&r), "object of type 'Int' has no attribute 'x'");
    }

    #[test]
    fn test_readonly_member_and_method() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);
        let r = set_attr(&reg, &p, "id", &Value::Int(1));
        assert_eq!(message(&r), "attribute 'id' of type 'Point' object is read-only");
        let r = set_attr(&reg, &p, "norm", &Value::Int(1));
        assert_eq!(message(&r), "attribute 'norm' of type 'Point' object is read-only");
    }

    #[test]
    fn test_type_mismatch_names_both_classes() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);
        let r = set_attr(&reg, &p, "x", &Value::Float(1.5));
        assert_eq!(message(&r), "cannot assign 'Float' to attribute 'x' of 'Point' object");
        let r = set_attr(&reg, &p, "label", &Value::Int(1));
        assert_eq!(message(&r), "cannot assign 'Int' to attribute 'label' of 'Point' object");
        let r = set_attr(&reg, &p, "tag", &make_string("ab"));
        assert_eq!(message(&r), "cannot assign 'Str' to attribute 'tag' of 'Point' object");
    }

    #[test]
    fn test_string_and_char_members() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);

        let r = get_attr(&reg, &p, "label");
        assert_eq!(message(&r), "attribute 'label' of 'Point' object is unset");

        set_attr(&reg, &p, "label", &make_string("origin"));
        assert_eq!(get_attr(&reg, &p, "label").as_str(), Some("origin"));

        set_attr(&reg, &p, "tag", &make_string("q"));
        assert_eq!(get_attr(&reg, &p, "tag").as_str(), Some("q"));
    }

    #[test]
    fn test_object_member_retains_and_releases() {
        let (reg, point) = setup();
        let p = ops::instantiate(&reg, point, &[]);
        let first = ops::instantiate(&reg, CLASS_OBJECT, &[]);
        let second = ops::instantiate(&reg, CLASS_OBJECT, &[]);
        let first_ref = first.as_object().unwrap().clone();

        set_attr(&reg, &p, "owner", &first);
        assert_eq!(Rc::strong_count(&first_ref), 3);

        // 같은 클래스이므로 TYPE_STRICT 통과, 이전 값 release
        assert_eq!(set_attr(&reg, &p, "owner", &second), Value::Int(0));
        assert_eq!(Rc::strong_count(&first_ref), 2);
        assert_eq!(get_attr(&reg, &p, "owner"), second);

        // 다른 클래스는 거부
        let r = set_attr(&reg, &p, "owner", &make_string("s"));
        assert_eq!(message(&r), "cannot assign 'Str' to attribute 'owner' of 'Point' object");
    }
}
