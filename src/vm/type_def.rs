//! - **Class**: 각 클래스의 디스크립터 (이름, 부모, 연산자 슬롯 테이블, 속성 사전)
//! - **Slot / SlotFn**: 슬롯 식별자와 해석된 구현
//! - **Member / MethodDef**: 네이티브 클래스의 타입 지정 멤버와 메서드 테이블
//! - **BinaryOp / UnaryOp / CmpOp**: 연산자 패밀리

use strum::{EnumCount, EnumIter, IntoStaticStr};

use super::registry::ClassRegistry;
use super::strdict::StrDict;
use super::value::{Field, Value};
use crate::runtime_io::RuntimeIo;

/// 클래스 레지스트리 인덱스
pub type ClassId = u16;

// ========== 슬롯 함수 시그니처 ==========

pub type UnaryFn = fn(&ClassRegistry, &Value) -> Value;
pub type BinaryFn = fn(&ClassRegistry, &Value, &Value) -> Value;
pub type TruthFn = fn(&ClassRegistry, &Value) -> bool;
pub type EqFn = fn(&ClassRegistry, &Value, &Value) -> bool;
pub type HashFn = fn(&ClassRegistry, &Value) -> i64;
pub type StrFn = fn(&ClassRegistry, &Value) -> String;
pub type CallFn = fn(&ClassRegistry, &Value, &[Value]) -> Value;
pub type PrintFn = fn(&ClassRegistry, &Value, &mut dyn RuntimeIo);
pub type LenFn = fn(&ClassRegistry, &Value) -> usize;
pub type SeqSetFn = fn(&ClassRegistry, &Value, &Value, &Value) -> Value;
pub type AttrGetFn = fn(&ClassRegistry, &Value, &str) -> Value;
pub type AttrSetFn = fn(&ClassRegistry, &Value, &str, &Value) -> Value;
/// 생성자: 할당된 인스턴스를 받아 초기화하고, 인스턴스 또는 에러 Value를 반환
pub type InitFn = fn(&ClassRegistry, &Value, &[Value]) -> Value;
/// 메서드: 첫 인자는 바인더(receiver)
pub type MethodFn = fn(&ClassRegistry, &Value, &[Value]) -> Value;

// ========== 연산자 패밀리 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    Xor,
    ShiftL,
    ShiftR,
}

impl BinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::Xor => "^",
            Self::ShiftL => "<<",
            Self::ShiftR => ">>",
        }
    }

    /// 복합 대입 토큰 (`+=` 등)
    pub fn inplace_token(self) -> &'static str {
        match self {
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Mod => "%=",
            Self::Pow => "**=",
            Self::BitAnd => "&=",
            Self::BitOr => "|=",
            Self::Xor => "^=",
            Self::ShiftL => "<<=",
            Self::ShiftR => ">>=",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Minus,
    Abs,
    BitNot,
}

impl UnaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Plus => "unary +",
            Self::Minus => "unary -",
            Self::Abs => "abs",
            Self::BitNot => "~",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 순서 비교 연산자. 모두 `cmp` 슬롯 하나로 해석됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }

    /// `cmp` 결과(음수/0/양수)를 참/거짓으로
    pub fn test(self, ordering: i64) -> bool {
        match self {
            Self::Lt => ordering < 0,
            Self::Gt => ordering > 0,
            Self::Le => ordering <= 0,
            Self::Ge => ordering >= 0,
        }
    }
}

// ========== 슬롯 테이블 ==========

#[derive(Debug, Clone, Default)]
pub struct NumMethods {
    pub unary: [Option<UnaryFn>; UnaryOp::COUNT],
    pub forward: [Option<BinaryFn>; BinaryOp::COUNT],
    pub inplace: [Option<BinaryFn>; BinaryOp::COUNT],
    pub reflected: [Option<BinaryFn>; BinaryOp::COUNT],
    pub nonzero: Option<TruthFn>,
    pub to_int: Option<UnaryFn>,
    pub to_float: Option<UnaryFn>,
}

#[derive(Debug, Clone, Default)]
pub struct SeqMethods {
    pub len: Option<LenFn>,
    pub get: Option<BinaryFn>,
    pub set: Option<SeqSetFn>,
    pub contains: Option<EqFn>,
    pub iter: Option<UnaryFn>,
    pub iternext: Option<UnaryFn>,
    pub apply: Option<BinaryFn>,
    pub iapply: Option<BinaryFn>,
}

/// 해석 가능한 슬롯 식별자 (해석 캐시의 키)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Eq,
    Hash,
    Cmp,
    Str,
    Call,
    Print,
    AttrGet,
    AttrSet,
    Unary(UnaryOp),
    Binary(BinaryOp),
    Inplace(BinaryOp),
    Reflected(BinaryOp),
    Nonzero,
    ToInt,
    ToFloat,
    Len,
    Get,
    Set,
    Contains,
    Iter,
    IterNext,
    Apply,
    IApply,
}

/// 해석된 슬롯 구현
#[derive(Debug, Clone, Copy)]
pub enum SlotFn {
    Unary(UnaryFn),
    Binary(BinaryFn),
    Truth(TruthFn),
    Eq(EqFn),
    Hash(HashFn),
    Str(StrFn),
    Call(CallFn),
    Print(PrintFn),
    Len(LenFn),
    SeqSet(SeqSetFn),
    AttrGet(AttrGetFn),
    AttrSet(AttrSetFn),
}

// ========== 멤버/메서드 ==========

/// 네이티브 멤버의 저장 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum MemberKind {
    Char,
    Byte,
    Short,
    Int,
    Long,
    UByte,
    UShort,
    UInt,
    ULong,
    Size,
    Bool,
    Float,
    Double,
    Str,
    Object,
}

impl MemberKind {
    /// 새 인스턴스의 0으로 초기화된 필드
    pub fn zeroed(self) -> Field {
        match self {
            Self::Char => Field::Char(0),
            Self::Byte => Field::Byte(0),
            Self::Short => Field::Short(0),
            Self::Int => Field::Int(0),
            Self::Long => Field::Long(0),
            Self::UByte => Field::UByte(0),
            Self::UShort => Field::UShort(0),
            Self::UInt => Field::UInt(0),
            Self::ULong => Field::ULong(0),
            Self::Size => Field::Size(0),
            Self::Bool => Field::Bool(false),
            Self::Float => Field::Float(0.0),
            Self::Double => Field::Double(0.0),
            Self::Str => Field::Str(None),
            Self::Object => Field::Object(None),
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemberFlags: u32 {
        /// 대입 불가
        const READONLY    = 1 << 0;

        /// 객체 멤버: 현재 값과 같은 클래스만 대입 가능
        const TYPE_STRICT = 1 << 1;
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    /// 인스턴스 필드 저장소 안의 위치
    pub index: usize,
    pub flags: MemberFlags,
}

impl Member {
    pub fn new(name: impl Into<String>, kind: MemberKind, index: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            index,
            flags: MemberFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub func: MethodFn,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, func: MethodFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

/// 속성 사전 엔트리: 메서드 테이블 또는 멤버 테이블의 인덱스
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrEntry {
    Method(usize),
    Member(usize),
}

/// `instantiate`가 할당할 인스턴스 데이터의 모양
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Plain,
    /// 멤버 테이블 크기만큼의 타입 지정 필드
    Fields,
    Exception,
    Str,
    Method,
    Code,
}

// ========== 클래스 디스크립터 ==========

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,

    /// 부모 클래스. 루트(Object)만 `None`
    pub base: Option<ClassId>,

    pub layout: Layout,

    /// 생성자 (상속되지 않음)
    pub init: Option<InitFn>,

    pub eq: Option<EqFn>,
    pub hash: Option<HashFn>,
    pub cmp: Option<BinaryFn>,
    pub str: Option<StrFn>,
    pub call: Option<CallFn>,
    pub print: Option<PrintFn>,
    pub attr_get: Option<AttrGetFn>,
    pub attr_set: Option<AttrSetFn>,

    pub num: NumMethods,
    pub seq: SeqMethods,

    pub members: Vec<Member>,
    pub methods: Vec<MethodDef>,

    /// 등록 시 members/methods로부터 구축
    pub(crate) attrs: StrDict<AttrEntry>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            layout: Layout::Plain,
            init: None,
            eq: None,
            hash: None,
            cmp: None,
            str: None,
            call: None,
            print: None,
            attr_get: None,
            attr_set: None,
            num: NumMethods::default(),
            seq: SeqMethods::default(),
            members: Vec::new(),
            methods: Vec::new(),
            attrs: StrDict::new(),
        }
    }

    pub fn extends(mut self, base: ClassId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_eq(mut self, f: EqFn) -> Self {
        self.eq = Some(f);
        self
    }

    pub fn with_hash(mut self, f: HashFn) -> Self {
        self.hash = Some(f);
        self
    }

    pub fn with_cmp(mut self, f: BinaryFn) -> Self {
        self.cmp = Some(f);
        self
    }

    pub fn with_str(mut self, f: StrFn) -> Self {
        self.str = Some(f);
        self
    }

    pub fn with_call(mut self, f: CallFn) -> Self {
        self.call = Some(f);
        self
    }

    pub fn with_print(mut self, f: PrintFn) -> Self {
        self.print = Some(f);
        self
    }

    pub fn with_attr_hooks(mut self, get: Option<AttrGetFn>, set: Option<AttrSetFn>) -> Self {
        self.attr_get = get;
        self.attr_set = set;
        self
    }

    pub fn with_nonzero(mut self, f: TruthFn) -> Self {
        self.num.nonzero = Some(f);
        self
    }

    /// `to_int` / `to_float` 변환 슬롯
    pub fn with_conversions(mut self, to_int: UnaryFn, to_float: UnaryFn) -> Self {
        self.num.to_int = Some(to_int);
        self.num.to_float = Some(to_float);
        self
    }

    pub fn with_seq(mut self, seq: SeqMethods) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_unary(mut self, op: UnaryOp, f: UnaryFn) -> Self {
        self.num.unary[op.index()] = Some(f);
        self
    }

    pub fn with_binary(mut self, op: BinaryOp, f: BinaryFn) -> Self {
        self.num.forward[op.index()] = Some(f);
        self
    }

    pub fn with_inplace(mut self, op: BinaryOp, f: BinaryFn) -> Self {
        self.num.inplace[op.index()] = Some(f);
        self
    }

    pub fn with_reflected(mut self, op: BinaryOp, f: BinaryFn) -> Self {
        self.num.reflected[op.index()] = Some(f);
        self
    }

    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members.extend(members);
        self
    }

    pub fn with_method(mut self, name: &str, func: MethodFn) -> Self {
        self.methods.push(MethodDef::new(name, func));
        self
    }

    /// 이 클래스 자신이 정의한 슬롯 (상속 미고려)
    pub fn own_slot(&self, slot: Slot) -> Option<SlotFn> {
        match slot {
            Slot::Eq => self.eq.map(SlotFn::Eq),
            Slot::Hash => self.hash.map(SlotFn::Hash),
            Slot::Cmp => self.cmp.map(SlotFn::Binary),
            Slot::Str => self.str.map(SlotFn::Str),
            Slot::Call => self.call.map(SlotFn::Call),
            Slot::Print => self.print.map(SlotFn::Print),
            Slot::AttrGet => self.attr_get.map(SlotFn::AttrGet),
            Slot::AttrSet => self.attr_set.map(SlotFn::AttrSet),
            Slot::Unary(op) => self.num.unary[op.index()].map(SlotFn::Unary),
            Slot::Binary(op) => self.num.forward[op.index()].map(SlotFn::Binary),
            Slot::Inplace(op) => self.num.inplace[op.index()].map(SlotFn::Binary),
            Slot::Reflected(op) => self.num.reflected[op.index()].map(SlotFn::Binary),
            Slot::Nonzero => self.num.nonzero.map(SlotFn::Truth),
            Slot::ToInt => self.num.to_int.map(SlotFn::Unary),
            Slot::ToFloat => self.num.to_float.map(SlotFn::Unary),
            Slot::Len => self.seq.len.map(SlotFn::Len),
            Slot::Get => self.seq.get.map(SlotFn::Binary),
            Slot::Set => self.seq.set.map(SlotFn::SeqSet),
            Slot::Contains => self.seq.contains.map(SlotFn::Eq),
            Slot::Iter => self.seq.iter.map(SlotFn::Unary),
            Slot::IterNext => self.seq.iternext.map(SlotFn::Unary),
            Slot::Apply => self.seq.apply.map(SlotFn::Binary),
            Slot::IApply => self.seq.iapply.map(SlotFn::Binary),
        }
    }

    pub fn attr(&self, name: &str) -> Option<AttrEntry> {
        self.attrs.get(name).copied()
    }

    /// 새 인스턴스용 필드 저장소
    pub fn zeroed_fields(&self) -> Vec<Field> {
        let size = self
            .members
            .iter()
            .map(|m| m.index + 1)
            .max()
            .unwrap_or(0);
        let mut fields: Vec<Field> = (0..size).map(|_| Field::Long(0)).collect();
        for m in &self.members {
            fields[m.index] = m.kind.zeroed();
        }
        fields
    }
}
