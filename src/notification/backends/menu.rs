//! 托盘菜单模型

use super::event_table::{EventRecord, Pixmap};
use serde::Serialize;

/// 菜单项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuEntry {
    Submenu {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        icon: Option<Pixmap>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tooltip: Option<String>,
        entries: Vec<MenuEntry>,
    },
    /// 事件动作，`index` 从 0 开始
    Action {
        label: String,
        event_id: String,
        index: usize,
    },
    Dismiss {
        label: String,
        event_id: String,
    },
    Separator,
    /// 不可点击的说明文字
    Label { text: String },
}

/// 为一条记录追加菜单项
///
/// VisualPath 的每一级嵌套一个子菜单，图标和提示放在最内层；
/// 之后依次是动作、关闭、分隔线和扩展文本。
pub fn append_record(menu: &mut Vec<MenuEntry>, record: &EventRecord, dismiss_label: &str) {
    let mut entries = Vec::with_capacity(record.actions.len() + 3);

    for (index, action) in record.actions.iter().enumerate() {
        entries.push(MenuEntry::Action {
            label: action.clone(),
            event_id: record.event_id.clone(),
            index,
        });
    }
    entries.push(MenuEntry::Dismiss {
        label: dismiss_label.to_string(),
        event_id: record.event_id.clone(),
    });
    entries.push(MenuEntry::Separator);
    entries.push(MenuEntry::Label {
        text: record.extended_text.clone(),
    });

    // 从最内层向外包裹
    let mut path = record.visual_path.iter().rev();
    let Some(innermost) = path.next() else {
        menu.extend(entries);
        return;
    };

    let tooltip = (!record.extended_text.is_empty()).then(|| record.extended_text.clone());
    let mut wrapped = MenuEntry::Submenu {
        title: innermost.clone(),
        icon: Some(record.pixmap.clone()),
        tooltip,
        entries,
    };
    for title in path {
        wrapped = MenuEntry::Submenu {
            title: title.clone(),
            icon: None,
            tooltip: None,
            entries: vec![wrapped],
        };
    }
    menu.push(wrapped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(visual_path: &[&str], actions: &[&str]) -> EventRecord {
        EventRecord {
            event_id: "e1".into(),
            category: "IM".into(),
            count: 1,
            extended_text: "2 new messages".into(),
            full_text: String::new(),
            visual_path: visual_path.iter().map(|s| s.to_string()).collect(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
            pixmap: Pixmap::Themed("dialog-information".into()),
            handling_object: None,
            first_seen: Utc::now(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_flat_record_without_visual_path() {
        let mut menu = Vec::new();
        append_record(&mut menu, &record(&[], &["Open", "Reply"]), "Dismiss");

        assert_eq!(
            menu,
            vec![
                MenuEntry::Action { label: "Open".into(), event_id: "e1".into(), index: 0 },
                MenuEntry::Action { label: "Reply".into(), event_id: "e1".into(), index: 1 },
                MenuEntry::Dismiss { label: "Dismiss".into(), event_id: "e1".into() },
                MenuEntry::Separator,
                MenuEntry::Label { text: "2 new messages".into() },
            ]
        );
    }

    #[test]
    fn test_visual_path_nesting() {
        let mut menu = Vec::new();
        append_record(&mut menu, &record(&["Chat", "alice"], &["Open"]), "Dismiss");

        assert_eq!(menu.len(), 1);
        let MenuEntry::Submenu { title, icon, entries, .. } = &menu[0] else {
            panic!("expected submenu");
        };
        assert_eq!(title, "Chat");
        assert!(icon.is_none());

        let MenuEntry::Submenu { title, icon, tooltip, entries } = &entries[0] else {
            panic!("expected nested submenu");
        };
        assert_eq!(title, "alice");
        assert!(icon.is_some());
        assert_eq!(tooltip.as_deref(), Some("2 new messages"));
        assert_eq!(entries.len(), 4);
    }
}
