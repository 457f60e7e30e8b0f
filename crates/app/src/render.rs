//! Server-rendered page shell.

use org_admin_api::{Departments, Positions, Resource};
use org_admin_core::{FormMode, RecordId, RowState};

use crate::views::{PositionSnapshot, ViewSnapshot};

pub const PAGE_TITLE: &str = "Gestión de Departamentos y Puestos";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Renders the whole page. `version` is the page-event version the snapshots
/// were taken at; the event stream uses it to detect missed updates.
pub fn page(
    departments: &ViewSnapshot<Departments>,
    positions: &PositionSnapshot,
    version: u64,
) -> String {
    let mut body = String::new();
    body.push_str("<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n");
    body.push_str(&format!("<title>{PAGE_TITLE}</title>\n</head>\n<body>\n"));
    body.push_str(&format!("<h1>{PAGE_TITLE}</h1>\n"));
    body.push_str(&department_section(departments));
    body.push_str("<hr>\n");
    body.push_str(&position_section(positions));
    body.push_str(&reload_script(version));
    body.push_str("</body>\n</html>\n");
    body
}

fn department_section(view: &ViewSnapshot<Departments>) -> String {
    let path = Departments::PATH;
    let mut out = String::from("<section id=\"departamentos\">\n<h2>Departamentos</h2>\n");

    out.push_str(&format!("<form method=\"post\" action=\"/{path}\">\n"));
    out.push_str(&text_input("nombre", "Nombre", &view.fields.name));
    out.push_str(&text_input("descripcion", "Descripción", &view.fields.description));
    out.push_str(&text_input("subcuenta", "Subcuenta", &view.fields.subaccount));
    out.push_str(&format!(
        "<button type=\"submit\">{}</button>\n</form>\n",
        view.submit_label
    ));
    out.push_str(&cancel_form(path, view.mode));

    if view.loading {
        out.push_str("<p class=\"loading\">Cargando…</p>\n");
    } else if view.items.is_empty() {
        out.push_str("<p>No hay departamentos registrados.</p>\n");
    } else {
        out.push_str("<ul>\n");
        for department in view.items.iter() {
            let label = format!("{} - {}", department.name, department.subaccount);
            out.push_str(&row(path, department.id, &label, view.row_state(department.id)));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
    out
}

fn position_section(snapshot: &PositionSnapshot) -> String {
    let view = &snapshot.view;
    let path = Positions::PATH;
    let mut out = String::from("<section id=\"puestos\">\n<h2>Puestos</h2>\n");

    out.push_str(&format!("<form method=\"post\" action=\"/{path}\">\n"));
    out.push_str(&text_input("nombre", "Nombre", &view.fields.name));
    out.push_str("<label>Departamento <select name=\"departamento_id\" required>\n");
    out.push_str("<option value=\"\">Seleccione un departamento</option>\n");
    for department in snapshot.departments.iter() {
        let selected = if view.fields.department_id == Some(department.id) {
            " selected"
        } else {
            ""
        };
        out.push_str(&format!(
            "<option value=\"{}\"{selected}>{}</option>\n",
            department.id,
            escape(&department.name)
        ));
    }
    out.push_str("</select></label>\n");
    let disabled = if snapshot.can_submit() { "" } else { " disabled" };
    out.push_str(&format!(
        "<button type=\"submit\"{disabled}>{}</button>\n</form>\n",
        view.submit_label
    ));
    out.push_str(&cancel_form(path, view.mode));

    if view.loading {
        out.push_str("<p class=\"loading\">Cargando…</p>\n");
    } else if view.items.is_empty() {
        out.push_str("<p>No hay puestos registrados.</p>\n");
    } else {
        out.push_str("<ul>\n");
        for position in view.items.iter() {
            let department = position
                .department_name(&snapshot.departments)
                .unwrap_or("—");
            let label = format!("{} - {department}", position.name);
            out.push_str(&row(path, position.id, &label, view.row_state(position.id)));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
    out
}

fn text_input(name: &str, label: &str, value: &str) -> String {
    format!(
        "<label>{label} <input type=\"text\" name=\"{name}\" value=\"{}\"></label>\n",
        escape(value)
    )
}

fn cancel_form(path: &str, mode: FormMode) -> String {
    match mode {
        FormMode::Create => String::new(),
        FormMode::Editing(_) => format!(
            "<form method=\"post\" action=\"/{path}/cancel\"><button type=\"submit\">Cancelar</button></form>\n"
        ),
    }
}

fn row(path: &str, id: RecordId, label: &str, state: Option<RowState>) -> String {
    let delete = match state {
        None => "<button type=\"submit\">Eliminar</button>",
        Some(RowState::Confirming(_)) => "<button type=\"submit\">¿Confirmar?</button>",
        Some(RowState::Deleting) => "<button type=\"submit\" disabled>Eliminando…</button>",
    };
    format!(
        "<li>{} \
         <form method=\"post\" action=\"/{path}/{id}/edit\"><button type=\"submit\">Editar</button></form> \
         <form method=\"post\" action=\"/{path}/{id}/delete\">{delete}</form></li>\n",
        escape(label)
    )
}

fn reload_script(version: u64) -> String {
    format!(
        "<script>\n\
         const events = new EventSource('/events?since={version}');\n\
         events.addEventListener('refresh', () => {{ events.close(); window.location.reload(); }});\n\
         </script>\n"
    )
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::*;
    use org_admin_core::{Department, DepartmentFields, DepartmentSummary, Position, PositionFields};

    fn department(id: RecordId, name: &str) -> Department {
        Department {
            id,
            name: name.into(),
            description: None,
            subaccount: "100".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn departments_snapshot(items: Vec<Department>) -> ViewSnapshot<Departments> {
        ViewSnapshot {
            items: Arc::new(items),
            loading: false,
            mode: FormMode::Create,
            fields: DepartmentFields::default(),
            submit_label: "Crear",
            rows: HashMap::new(),
        }
    }

    fn positions_snapshot(items: Vec<Position>, departments: Vec<Department>) -> PositionSnapshot {
        PositionSnapshot {
            view: ViewSnapshot {
                items: Arc::new(items),
                loading: false,
                mode: FormMode::Create,
                fields: PositionFields::default(),
                submit_label: "Crear",
                rows: HashMap::new(),
            },
            departments: Arc::new(departments),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>\"R&D\"</b>"),
            "&lt;b&gt;&quot;R&amp;D&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn empty_page_shows_empty_states_and_disables_position_submit() {
        let html = page(
            &departments_snapshot(Vec::new()),
            &positions_snapshot(Vec::new(), Vec::new()),
            7,
        );
        assert!(html.contains(PAGE_TITLE));
        assert!(html.contains("No hay departamentos registrados."));
        assert!(html.contains("No hay puestos registrados."));
        assert!(html.contains("<button type=\"submit\" disabled>Crear</button>"));
        assert!(html.contains("/events?since=7"));
        assert!(!html.contains("Cancelar"));
    }

    #[test]
    fn rows_show_names_and_confirm_state() {
        let mut departments = departments_snapshot(vec![department(1, "I+D <Lab>")]);
        departments.rows.insert(1, RowState::Confirming(1));
        let position = Position {
            id: 3,
            name: "Vendedor".into(),
            department_id: None,
            department: Some(DepartmentSummary {
                id: 1,
                name: "I+D <Lab>".into(),
            }),
            created_at: None,
            updated_at: None,
        };
        let positions = positions_snapshot(vec![position], vec![department(1, "I+D <Lab>")]);

        let html = page(&departments, &positions, 0);
        assert!(html.contains("I+D &lt;Lab&gt; - 100"));
        assert!(html.contains("Vendedor - I+D &lt;Lab&gt;"));
        assert!(html.contains("¿Confirmar?"));
        assert!(html.contains("action=\"/puestos/3/delete\""));
    }

    #[test]
    fn editing_prefills_form_and_offers_cancel() {
        let mut departments = departments_snapshot(vec![department(2, "Ventas")]);
        departments.mode = FormMode::Editing(2);
        departments.submit_label = "Actualizar";
        departments.fields = DepartmentFields {
            name: "Ventas".into(),
            description: String::new(),
            subaccount: "100".into(),
        };
        let html = page(
            &departments,
            &positions_snapshot(Vec::new(), Vec::new()),
            0,
        );
        assert!(html.contains("name=\"nombre\" value=\"Ventas\""));
        assert!(html.contains(">Actualizar</button>"));
        assert!(html.contains("action=\"/departamentos/cancel\""));
    }

    #[test]
    fn loading_indicator_replaces_list() {
        let mut departments = departments_snapshot(vec![department(1, "Ventas")]);
        departments.loading = true;
        let html = page(
            &departments,
            &positions_snapshot(Vec::new(), Vec::new()),
            0,
        );
        assert!(html.contains("Cargando…"));
        assert!(!html.contains("Ventas - 100"));
    }
}
