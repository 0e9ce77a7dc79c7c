//! 处理对象的弱引用
//!
//! 通知的发起方可以附带一个处理对象，用户点击某个动作时把动作序号投递给它。
//! 发起方可能在动作排队期间被销毁，所以只保存弱引用，投递前 `upgrade`。

use std::fmt;
use std::sync::{Arc, Weak};

/// 接收通知动作的对象
pub trait HandlingObject: Send + Sync {
    /// 用户触发了第 `index` 个动作
    fn notification_action_triggered(&self, index: usize);
}

/// 处理对象的弱引用
#[derive(Clone)]
pub struct HandlingRef(Weak<dyn HandlingObject>);

impl HandlingRef {
    pub fn new<T: HandlingObject + 'static>(object: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(object);
        Self(weak)
    }

    /// 投递动作序号，引用已失效时返回 `false`
    pub fn deliver(&self, index: usize) -> bool {
        match self.0.upgrade() {
            Some(object) => {
                object.notification_action_triggered(index);
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl PartialEq for HandlingRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HandlingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlingRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}
