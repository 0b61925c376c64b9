//! 클래스 레지스트리 + 슬롯 해석(dispatch)
//!
//! 시작 시 builtin 클래스로 채워지고, 이후에는 해석 캐시만 변경됩니다.
//!
//! # 해석 알고리즘
//!
//! 1. `(class, slot)` 캐시 조회
//! 2. 없으면 class 자신부터 `base`를 따라 올라가며 첫 구현을 찾음
//! 3. 찾으면 **처음 질의한 클래스** 키로 캐시에 기록 → 상속 깊이와 무관하게
//!    클래스당 연산자별 체인 탐색은 최대 한 번
//!
//! 캐시는 무효화되지 않으므로, 등록이 끝난 클래스의 슬롯 테이블은 변경하면 안 됩니다.
//! (`register`가 `&mut self`를 요구하므로 해석과 등록이 섞일 수 없습니다.)

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::builtins::{self, CLASS_EXCEPTION, CLASS_OBJECT};
use super::error::Error;
use super::type_def::{
    AttrEntry, AttrGetFn, AttrSetFn, BinaryFn, CallFn, Class, ClassId, EqFn, HashFn, Layout,
    LenFn, PrintFn, SeqSetFn, Slot, SlotFn, StrFn, TruthFn, UnaryFn,
};
use super::value::Value;

pub struct ClassRegistry {
    classes: Vec<Class>,
    cache: RefCell<HashMap<(ClassId, Slot), SlotFn>>,
    walks: Cell<usize>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// builtin 클래스가 등록된 레지스트리
    ///
    /// builtin 표는 고정되어 있고 부모가 항상 먼저 등록되므로 등록은 실패하지 않습니다.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        builtins::register_builtins(&mut registry).expect("builtin class table is well-formed");
        registry
    }

    fn empty() -> Self {
        Self {
            classes: Vec::new(),
            cache: RefCell::new(HashMap::new()),
            walks: Cell::new(0),
        }
    }

    /// 클래스를 등록하고 속성 사전을 구축합니다.
    ///
    /// - 루트 이외의 클래스는 `base`가 없으면 Object를 부모로 가집니다.
    /// - 부모는 이미 등록되어 있어야 합니다 (super 체인의 비순환성 보장).
    /// - 부모의 인스턴스 레이아웃은 `Plain`인 자식에게 상속됩니다.
    pub fn register(&mut self, mut class: Class) -> Result<ClassId, Error> {
        let id = ClassId::try_from(self.classes.len())
            .map_err(|_| Error::fatal("class registry is full"))?;

        if id != CLASS_OBJECT {
            let base = class.base.unwrap_or(CLASS_OBJECT);
            let base_class = self.classes.get(base as usize).ok_or_else(|| {
                Error::fatal(format!(
                    "class '{}' extends unregistered class id {}",
                    class.name, base
                ))
            })?;
            if class.layout == Layout::Plain {
                class.layout = base_class.layout;
            }
            class.base = Some(base);
        } else {
            class.base = None;
        }

        build_attr_dict(&mut class)?;

        tracing::trace!(class = %class.name, id, "registered class");
        self.classes.push(class);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id as usize)
    }

    pub fn name(&self, id: ClassId) -> &str {
        self.get(id).map_or("<unknown>", |c| c.name.as_str())
    }

    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| ClassId::try_from(i).ok())
    }

    /// 값의 클래스 이름 (sentinel은 내부 표기)
    pub fn class_name_of(&self, v: &Value) -> &str {
        match v.class_id() {
            Some(id) => self.name(id),
            None => "<sentinel>",
        }
    }

    // ========== 상속 ==========

    /// `class`가 `target`이거나 그 하위 클래스인지 (단일 super 체인)
    pub fn is_subclass(&self, class: ClassId, target: ClassId) -> bool {
        let mut cur = Some(class);
        while let Some(id) = cur {
            if id == target {
                return true;
            }
            cur = self.get(id).and_then(|c| c.base);
        }
        false
    }

    pub fn is_a(&self, v: &Value, target: ClassId) -> bool {
        v.class_id()
            .is_some_and(|class| self.is_subclass(class, target))
    }

    pub fn is_exception_class(&self, class: ClassId) -> bool {
        self.is_subclass(class, CLASS_EXCEPTION)
    }

    // ========== 슬롯 해석 ==========

    /// 가장 가까운 구현을 찾고 질의한 클래스에 캐시합니다.
    /// 없으면 `None` (지원하지 않는 연산일 뿐 치명적 에러는 아님).
    pub fn resolve(&self, class: ClassId, slot: Slot) -> Option<SlotFn> {
        if let Some(found) = self.cache.borrow().get(&(class, slot)) {
            return Some(*found);
        }

        self.walks.set(self.walks.get() + 1);
        let mut cur = Some(class);
        while let Some(id) = cur {
            let c = self.get(id)?;
            if let Some(found) = c.own_slot(slot) {
                tracing::trace!(class = self.name(class), owner = %c.name, ?slot, "resolved slot");
                self.cache.borrow_mut().insert((class, slot), found);
                return Some(found);
            }
            cur = c.base;
        }
        None
    }

    /// 지금까지 수행된 super 체인 탐색 횟수
    pub fn resolution_walks(&self) -> usize {
        self.walks.get()
    }

    pub fn is_cached(&self, class: ClassId, slot: Slot) -> bool {
        self.cache.borrow().contains_key(&(class, slot))
    }

    pub fn resolve_unary(&self, class: ClassId, slot: Slot) -> Option<UnaryFn> {
        match self.resolve(class, slot)? {
            SlotFn::Unary(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_binary(&self, class: ClassId, slot: Slot) -> Option<BinaryFn> {
        match self.resolve(class, slot)? {
            SlotFn::Binary(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_truth(&self, class: ClassId) -> Option<TruthFn> {
        match self.resolve(class, Slot::Nonzero)? {
            SlotFn::Truth(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_eq(&self, class: ClassId, slot: Slot) -> Option<EqFn> {
        match self.resolve(class, slot)? {
            SlotFn::Eq(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_hash(&self, class: ClassId) -> Option<HashFn> {
        match self.resolve(class, Slot::Hash)? {
            SlotFn::Hash(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_str(&self, class: ClassId) -> Option<StrFn> {
        match self.resolve(class, Slot::Str)? {
            SlotFn::Str(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_call(&self, class: ClassId) -> Option<CallFn> {
        match self.resolve(class, Slot::Call)? {
            SlotFn::Call(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_print(&self, class: ClassId) -> Option<PrintFn> {
        match self.resolve(class, Slot::Print)? {
            SlotFn::Print(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_len(&self, class: ClassId) -> Option<LenFn> {
        match self.resolve(class, Slot::Len)? {
            SlotFn::Len(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_set(&self, class: ClassId) -> Option<SeqSetFn> {
        match self.resolve(class, Slot::Set)? {
            SlotFn::SeqSet(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_attr_get(&self, class: ClassId) -> Option<AttrGetFn> {
        match self.resolve(class, Slot::AttrGet)? {
            SlotFn::AttrGet(f) => Some(f),
            _ => None,
        }
    }

    pub fn resolve_attr_set(&self, class: ClassId) -> Option<AttrSetFn> {
        match self.resolve(class, Slot::AttrSet)? {
            SlotFn::AttrSet(f) => Some(f),
            _ => None,
        }
    }
}

/// 멤버/메서드 테이블로부터 이름 → 엔트리 사전을 만듭니다.
fn build_attr_dict(class: &mut Class) -> Result<(), Error> {
    for (i, m) in class.members.iter().enumerate() {
        if class.attrs.put(m.name.as_str(), AttrEntry::Member(i)).is_some() {
            return Err(duplicate_attr(&class.name, &m.name));
        }
    }
    for (i, m) in class.methods.iter().enumerate() {
        if class.attrs.put(m.name.as_str(), AttrEntry::Method(i)).is_some() {
            return Err(duplicate_attr(&class.name, &m.name));
        }
    }
    Ok(())
}

fn duplicate_attr(class: &str, attr: &str) -> Error {
    Error::fatal(format!(
        "class '{}' defines attribute '{}' more than once",
        class, attr
    ))
}
