use hbv_web::session::Session;
use std::cell::RefCell;
use std::rc::Rc;
use yew::prelude::*;

/// Shared handle to the page session.
///
/// Every mutation goes through [`SessionHandle::update`], which re-renders
/// the component that owns the hook once the closure has returned.
#[derive(Clone)]
pub struct SessionHandle {
    session: Rc<RefCell<Session>>,
    refresh: UseForceUpdateHandle,
}

impl SessionHandle {
    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&*self.session.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let result = f(&mut *self.session.borrow_mut());
        self.refresh.force_update();
        result
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.session, &other.session)
    }
}

/// Create the session once per mount and keep it for the page lifetime.
#[hook]
pub fn use_session() -> SessionHandle {
    let session = use_mut_ref(Session::new);
    let refresh = use_force_update();
    SessionHandle { session, refresh }
}
