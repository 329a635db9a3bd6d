//! Host callables and their type-erased registry entries.
//!
//! Any `Fn(&mut T, A1, ..., An) -> R` whose argument and return types are
//! [`NativeType`]s is a [`HostMethod`] for host struct `T`, for up to eight
//! declared parameters. Its [`MethodSignature`] is derived from the same
//! types that decode its arguments, so the installed encoding and the
//! decoder cannot drift apart.

use crate::error::{Error, Result};
use crate::handle::Selector;
use crate::signature::{MethodSignature, NativeType};
use oxrt::Value;
use std::any::{TypeId, type_name};
use std::ffi::c_void;
use std::fmt;

/// A host function callable as a method on host struct `T`.
///
/// `Args` is a tuple of the declared parameter types; it only exists to keep
/// the blanket implementations for each arity apart.
pub trait HostMethod<T, Args>: Send + Sync + 'static {
    /// Signature derived from the function's parameter and return types.
    fn signature() -> MethodSignature;

    /// Decodes `args` and calls the function with `this` first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueShapeMismatch`] if an argument is missing or
    /// does not convert to the declared type.
    fn call(&self, this: &mut T, args: &[Value]) -> Result<Value>;
}

fn decode<A: NativeType>(args: &[Value], index: usize) -> Result<A> {
    let value = args.get(index).copied();
    value
        .and_then(A::from_value)
        .ok_or_else(|| Error::ValueShapeMismatch {
            index,
            expected: A::SHAPE,
            got: value.map(|v| v.type_code().as_char()),
        })
}

macro_rules! impl_host_method {
    ($($arg:ident => $index:tt),*) => {
        impl<T, F, R, $($arg,)*> HostMethod<T, ($($arg,)*)> for F
        where
            T: 'static,
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: NativeType,
            $($arg: NativeType,)*
        {
            fn signature() -> MethodSignature {
                MethodSignature::new(R::SHAPE, vec![$($arg::SHAPE),*])
            }

            #[allow(unused_variables)]
            fn call(&self, this: &mut T, args: &[Value]) -> Result<Value> {
                Ok(self(this, $(decode::<$arg>(args, $index)?),*).into_value())
            }
        }
    };
}

impl_host_method!();
impl_host_method!(A1 => 0);
impl_host_method!(A1 => 0, A2 => 1);
impl_host_method!(A1 => 0, A2 => 1, A3 => 2);
impl_host_method!(A1 => 0, A2 => 1, A3 => 2, A4 => 3);
impl_host_method!(A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4);
impl_host_method!(A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5);
impl_host_method!(A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5, A7 => 6);
impl_host_method!(A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5, A7 => 6, A8 => 7);

type ErasedCall = Box<dyn Fn(*mut c_void, &[Value]) -> Result<Value> + Send + Sync>;

/// A registered host method: selector, signature and the type-erased call.
pub struct MethodEntry {
    selector: Selector,
    host_type: TypeId,
    host_type_name: &'static str,
    signature: MethodSignature,
    encoding: String,
    call: ErasedCall,
}

impl MethodEntry {
    /// Erases `f` into an entry for `selector` on host struct `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedShape`] if the signature has no native
    /// encoding.
    pub fn new<T, Args, F>(selector: Selector, f: F) -> Result<Self>
    where
        T: 'static,
        F: HostMethod<T, Args>,
    {
        let signature = F::signature();
        let encoding = signature.encode()?;

        let call: ErasedCall = Box::new(move |host, args| {
            // SAFETY: `invoke` is only called with a pointer to a live `T`
            let this = unsafe { &mut *host.cast::<T>() };
            f.call(this, args)
        });

        Ok(MethodEntry {
            selector,
            host_type: TypeId::of::<T>(),
            host_type_name: type_name::<T>(),
            signature,
            encoding,
            call,
        })
    }

    /// Selector the entry answers.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Host struct type the callable expects.
    #[must_use]
    pub fn host_type(&self) -> TypeId {
        self.host_type
    }

    /// Name of [`MethodEntry::host_type`], for diagnostics.
    #[must_use]
    pub fn host_type_name(&self) -> &'static str {
        self.host_type_name
    }

    /// Declared signature.
    #[must_use]
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Native encoding installed with the trampoline.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Calls the host function on the struct at `host`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueShapeMismatch`] if `args` do not match the
    /// signature.
    ///
    /// # Safety
    ///
    /// `host` must point to a live value of the entry's host type, not
    /// aliased for the duration of the call.
    pub unsafe fn invoke(&self, host: *mut c_void, args: &[Value]) -> Result<Value> {
        (self.call)(host, args)
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("selector", &self.selector)
            .field("host_type", &self.host_type_name)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;
    use crate::signature::Shape;
    use oxrt::TypeCode;
    use std::ptr;

    #[derive(Default)]
    struct Tally {
        calls: Vec<(i32, f64)>,
    }

    #[test]
    fn test_signature_from_function_type() {
        fn record(this: &mut Tally, a: i32, b: f64) -> bool {
            this.calls.push((a, b));
            true
        }

        let entry = MethodEntry::new(Selector::register("record:with:"), record).unwrap();
        assert_eq!(entry.encoding(), "B@:id");
        assert_eq!(entry.signature().arity(), 2);
        assert_eq!(entry.host_type(), TypeId::of::<Tally>());
    }

    #[test]
    fn test_invoke_passes_this_and_args() {
        let entry = MethodEntry::new(
            Selector::register("record:with:"),
            |this: &mut Tally, a: i32, b: f64| {
                this.calls.push((a, b));
                a * 2
            },
        )
        .unwrap();

        let mut tally = Tally::default();
        let host = ptr::from_mut(&mut tally).cast::<c_void>();
        let result = unsafe { entry.invoke(host, &[Value::Int(4), Value::Double(0.5)]) };

        assert_eq!(result, Ok(Value::Int(8)));
        assert_eq!(tally.calls, vec![(4, 0.5)]);
    }

    #[test]
    fn test_invoke_reports_mismatch() {
        let entry = MethodEntry::new(Selector::register("take:"), |_: &mut Tally, _: Handle| {})
            .unwrap();
        let mut tally = Tally::default();
        let host = ptr::from_mut(&mut tally).cast::<c_void>();

        let result = unsafe { entry.invoke(host, &[Value::Int(1)]) };
        assert_eq!(
            result,
            Err(Error::ValueShapeMismatch {
                index: 0,
                expected: Shape::Primitive(TypeCode::Object),
                got: Some('i'),
            })
        );

        let result = unsafe { entry.invoke(host, &[]) };
        assert!(matches!(
            result,
            Err(Error::ValueShapeMismatch { got: None, .. })
        ));
    }

    #[test]
    fn test_zero_arity() {
        let entry = MethodEntry::new(Selector::register("reset"), |this: &mut Tally| {
            this.calls.clear();
        })
        .unwrap();
        assert_eq!(entry.encoding(), "v@:");
    }
}
