pub const SCHEMA: &str = r#"
-- Users own projects; tokens are just auth credentials for users
CREATE TABLE IF NOT EXISTS usuarios (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- short prefix for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,
    user_id TEXT REFERENCES usuarios(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Lookup catalogs. Soft-deleted rows stay referenced by existing entities.
CREATE TABLE IF NOT EXISTS tipos_requisito (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL UNIQUE,
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS prioridades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL UNIQUE,
    nivel INTEGER NOT NULL UNIQUE,
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS estados_proyecto (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL UNIQUE,
    orden INTEGER NOT NULL UNIQUE,
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1
);

-- Status names are unique per element kind, not globally
CREATE TABLE IF NOT EXISTS estados_elemento (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL,
    tipo TEXT NOT NULL,  -- 'requisito', 'caso_uso', 'historia_usuario'
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1,
    UNIQUE(nombre, tipo)
);

CREATE TABLE IF NOT EXISTS tipos_relacion_cu (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL UNIQUE,
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS tipos_relacion_requisito (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL UNIQUE,
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS tipos_estimacion (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL UNIQUE,   -- story points, horas, dias, costo
    descripcion TEXT,
    activo INTEGER NOT NULL DEFAULT 1
);

-- Projects scope every child entity and are visible to their owner only
CREATE TABLE IF NOT EXISTS proyectos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    estado TEXT NOT NULL DEFAULT 'Requisitos',  -- free label, not a FK
    usuario_id TEXT NOT NULL REFERENCES usuarios(id),
    fecha_creacion TEXT DEFAULT (datetime('now')),
    fecha_actualizacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS requisitos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL,
    descripcion TEXT NOT NULL,
    tipo_id INTEGER NOT NULL REFERENCES tipos_requisito(id),
    criterios TEXT NOT NULL,
    prioridad_id INTEGER REFERENCES prioridades(id),
    estado_id INTEGER REFERENCES estados_elemento(id),
    origen TEXT,
    condiciones_previas TEXT,
    proyecto_id INTEGER NOT NULL REFERENCES proyectos(id),
    fecha_creacion TEXT DEFAULT (datetime('now')),
    fecha_actualizacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS relaciones_requisitos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    requisito_origen_id INTEGER NOT NULL REFERENCES requisitos(id) ON DELETE CASCADE,
    requisito_destino_id INTEGER NOT NULL REFERENCES requisitos(id) ON DELETE CASCADE,
    tipo_relacion_id INTEGER NOT NULL REFERENCES tipos_relacion_requisito(id),
    descripcion TEXT,
    fecha_creacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS casos_uso (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    actores TEXT NOT NULL,             -- comma-joined list
    precondiciones TEXT NOT NULL,
    flujo_principal TEXT,              -- JSON array
    flujos_alternativos TEXT,          -- JSON array
    postcondiciones TEXT,
    requisitos_especiales TEXT,
    riesgos_consideraciones TEXT,
    proyecto_id INTEGER NOT NULL REFERENCES proyectos(id),
    prioridad_id INTEGER REFERENCES prioridades(id),
    estado_id INTEGER REFERENCES estados_elemento(id),
    fecha_creacion TEXT DEFAULT (datetime('now')),
    fecha_actualizacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS relaciones_casos_uso (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    caso_uso_origen_id INTEGER NOT NULL REFERENCES casos_uso(id) ON DELETE CASCADE,
    caso_uso_destino_id INTEGER NOT NULL REFERENCES casos_uso(id) ON DELETE CASCADE,
    tipo_relacion_id INTEGER NOT NULL REFERENCES tipos_relacion_cu(id),
    descripcion TEXT,
    fecha_creacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS historias_usuario (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    titulo TEXT NOT NULL,
    descripcion TEXT,
    actor_rol TEXT,
    funcionalidad_accion TEXT,
    beneficio_razon TEXT,
    criterios_aceptacion TEXT NOT NULL,
    prioridad_id INTEGER REFERENCES prioridades(id),
    estado_id INTEGER REFERENCES estados_elemento(id),
    valor_negocio INTEGER,
    dependencias_relaciones TEXT,
    componentes_relacionados TEXT,
    notas_adicionales TEXT,
    proyecto_id INTEGER NOT NULL REFERENCES proyectos(id),
    fecha_creacion TEXT DEFAULT (datetime('now')),
    fecha_actualizacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

-- One active row per (historia, tipo) is an update-path invariant, not a
-- constraint: the create path may insert duplicates on purpose.
CREATE TABLE IF NOT EXISTS historias_estimaciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    historia_id INTEGER NOT NULL REFERENCES historias_usuario(id) ON DELETE CASCADE,
    tipo_estimacion_id INTEGER NOT NULL REFERENCES tipos_estimacion(id),
    valor REAL NOT NULL,
    fecha_creacion TEXT DEFAULT (datetime('now')),
    fecha_actualizacion TEXT DEFAULT (datetime('now')),
    activo INTEGER NOT NULL DEFAULT 1
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_proyectos_usuario ON proyectos(usuario_id);
CREATE INDEX IF NOT EXISTS idx_requisitos_proyecto ON requisitos(proyecto_id);
CREATE INDEX IF NOT EXISTS idx_rel_req_origen ON relaciones_requisitos(requisito_origen_id);
CREATE INDEX IF NOT EXISTS idx_rel_req_destino ON relaciones_requisitos(requisito_destino_id);
CREATE INDEX IF NOT EXISTS idx_casos_uso_proyecto ON casos_uso(proyecto_id);
CREATE INDEX IF NOT EXISTS idx_rel_cu_origen ON relaciones_casos_uso(caso_uso_origen_id);
CREATE INDEX IF NOT EXISTS idx_rel_cu_destino ON relaciones_casos_uso(caso_uso_destino_id);
CREATE INDEX IF NOT EXISTS idx_historias_proyecto ON historias_usuario(proyecto_id);
CREATE INDEX IF NOT EXISTS idx_estimaciones_historia ON historias_estimaciones(historia_id);
"#;

/// Baseline catalog rows. `INSERT OR IGNORE` keyed on the unique name
/// columns keeps `initialize()` idempotent. Each element kind gets its own
/// 'Pendiente' row; entity creation falls back to the lowest-id active
/// status of the entity's kind.
pub const SEED: &str = r#"
INSERT OR IGNORE INTO estados_elemento (nombre, tipo, descripcion) VALUES
    ('Pendiente', 'requisito', 'Elemento registrado, sin revisar'),
    ('Pendiente', 'caso_uso', 'Elemento registrado, sin revisar'),
    ('Pendiente', 'historia_usuario', 'Elemento registrado, sin revisar'),
    ('Aprobado', 'requisito', NULL),
    ('Aprobado', 'caso_uso', NULL),
    ('Aprobado', 'historia_usuario', NULL);

INSERT OR IGNORE INTO prioridades (nombre, nivel, descripcion) VALUES
    ('Alta', 1, NULL),
    ('Media', 2, NULL),
    ('Baja', 3, NULL);

INSERT OR IGNORE INTO estados_proyecto (nombre, orden, descripcion) VALUES
    ('Requisitos', 1, 'Levantamiento de requisitos'),
    ('Diseño', 2, NULL),
    ('Desarrollo', 3, NULL),
    ('Cerrado', 4, NULL);

INSERT OR IGNORE INTO tipos_requisito (nombre, descripcion) VALUES
    ('Funcional', NULL),
    ('No funcional', NULL);

INSERT OR IGNORE INTO tipos_relacion_requisito (nombre, descripcion) VALUES
    ('Depende de', NULL),
    ('Relacionado con', NULL);

INSERT OR IGNORE INTO tipos_relacion_cu (nombre, descripcion) VALUES
    ('Incluye', NULL),
    ('Extiende', NULL);

INSERT OR IGNORE INTO tipos_estimacion (nombre, descripcion) VALUES
    ('Story points', NULL),
    ('Horas', NULL);
"#;
